//! Error types for the service handler.

use otn_renderer::RendererError;
use std::io;
use thiserror::Error;

/// Result type alias for service handler operations.
pub type ServiceHandlerResult<T> = Result<T, ServiceHandlerError>;

/// Errors raised by the service handler and the daemon wiring.
#[derive(Debug, Error)]
pub enum ServiceHandlerError {
    /// Service datastore operation failed.
    #[error("Datastore operation failed: {operation}: {message}")]
    Datastore {
        /// The operation that failed (e.g. "create", "modify").
        operation: String,
        /// Error message.
        message: String,
    },

    /// No service with this name is known.
    #[error("Service '{name}' not found")]
    ServiceNotFound {
        /// The service name.
        name: String,
    },

    /// A service with this name already exists.
    #[error("Service '{name}' already exists")]
    ServiceExists {
        /// The service name.
        name: String,
    },

    /// Configuration could not be read or is invalid.
    #[error("Invalid configuration for {field}: {message}")]
    Config {
        /// The field or file that failed.
        field: String,
        /// Error message.
        message: String,
    },

    /// A notification topic was closed while still in use.
    #[error("Channel '{topic}' closed")]
    ChannelClosed {
        /// Topic name.
        topic: String,
    },

    /// Request rejected by the renderer.
    #[error(transparent)]
    Renderer(#[from] RendererError),
}

impl ServiceHandlerError {
    /// Creates a datastore error.
    pub fn datastore(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Datastore {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a service-not-found error.
    pub fn service_not_found(name: impl Into<String>) -> Self {
        Self::ServiceNotFound { name: name.into() }
    }

    /// Creates a service-exists error.
    pub fn service_exists(name: impl Into<String>) -> Self {
        Self::ServiceExists { name: name.into() }
    }

    /// Creates a configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a channel-closed error.
    pub fn channel_closed(topic: impl Into<String>) -> Self {
        Self::ChannelClosed {
            topic: topic.into(),
        }
    }

    /// Returns true if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ServiceNotFound { .. })
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl From<io::Error> for ServiceHandlerError {
    fn from(err: io::Error) -> Self {
        Self::config("file", err.to_string())
    }
}

impl From<serde_yaml::Error> for ServiceHandlerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::config("yaml", err.to_string())
    }
}
