//! Renderer error types.

use otn_orch_common::{DeviceError, PowerError};
use otn_types::NodeId;
use thiserror::Error;

/// Errors raised while provisioning a single device interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    /// The interface could not be written or committed.
    #[error("failed to create interface {name} on {node}: {source}")]
    Create {
        node: NodeId,
        name: String,
        source: DeviceError,
    },

    /// The interface could not be removed.
    #[error("failed to delete interface {name} on {node}: {source}")]
    Delete {
        node: NodeId,
        name: String,
        source: DeviceError,
    },

    /// The interface does not exist on the device.
    #[error("interface {name} not found on {node}")]
    NotFound { node: NodeId, name: String },
}

impl InterfaceError {
    /// Returns true if the interface was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, InterfaceError::NotFound { .. })
    }

    /// Returns true if the underlying device was not mounted.
    pub fn is_not_mounted(&self) -> bool {
        match self {
            InterfaceError::Create { source, .. } | InterfaceError::Delete { source, .. } => {
                source.is_not_mounted()
            }
            InterfaceError::NotFound { .. } => false,
        }
    }
}

/// Errors raised by the device renderer and the service orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    /// A node on the path is not mounted on the controller.
    #[error("{node} is not mounted on the controller")]
    NodeNotMounted { node: NodeId },

    /// An interface could not be created.
    #[error(transparent)]
    InterfaceCreation(#[from] InterfaceError),

    /// The device refused to create a cross-connect.
    #[error("cross-connect {src} -> {dst} refused on {node}")]
    CrossConnectRefused {
        node: NodeId,
        src: String,
        dst: String,
    },

    /// Compensation left objects behind on some nodes.
    #[error("rollback left configuration behind on: {}", nodes.iter().map(NodeId::as_str).collect::<Vec<_>>().join(", "))]
    RollbackPartialFailure { nodes: Vec<NodeId> },

    /// A power management request failed.
    #[error(transparent)]
    Power(#[from] PowerError),

    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RendererError {
    /// Creates an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns true for malformed-input errors.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, RendererError::InvalidRequest(_))
    }

    /// Returns true if the error is a not-mounted node.
    pub fn is_not_mounted(&self) -> bool {
        match self {
            RendererError::NodeNotMounted { .. } => true,
            RendererError::InterfaceCreation(e) => e.is_not_mounted(),
            _ => false,
        }
    }
}

impl From<otn_types::ParseError> for RendererError {
    fn from(err: otn_types::ParseError) -> Self {
        RendererError::InvalidRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_mounted_classification() {
        let node = NodeId::from("node1");
        let err = RendererError::from(InterfaceError::Create {
            node: node.clone(),
            name: "if1".to_string(),
            source: DeviceError::not_mounted(&node),
        });
        assert!(err.is_not_mounted());
        assert!(!err.is_invalid_request());

        let err = RendererError::NodeNotMounted { node };
        assert_eq!(err.to_string(), "node1 is not mounted on the controller");
    }

    #[test]
    fn test_partial_failure_lists_nodes() {
        let err = RendererError::RollbackPartialFailure {
            nodes: vec![NodeId::from("a"), NodeId::from("b")],
        };
        assert_eq!(err.to_string(), "rollback left configuration behind on: a, b");
    }
}
