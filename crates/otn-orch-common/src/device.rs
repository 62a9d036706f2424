//! Device access port.
//!
//! A network element is configured through its mounted device model: the
//! controller stages writes and deletes against configuration paths and
//! commits them as one transaction. [`DeviceAccess`] is the narrow port the
//! renderer consumes; the transport behind it (NETCONF mount, gNMI, a
//! simulator) is not visible to callers.

use async_trait::async_trait;
use otn_types::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors reported by the device access layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The node is not mounted on the controller.
    #[error("{node} is not mounted on the controller")]
    NotMounted { node: NodeId },

    /// A device call exceeded its time budget.
    #[error("{operation} on {node} timed out after {budget_ms}ms")]
    Timeout {
        node: NodeId,
        operation: String,
        budget_ms: u64,
    },

    /// The configuration object does not exist.
    #[error("{path} not found on {node}")]
    NotFound { node: NodeId, path: DevicePath },

    /// The device rejected the request.
    #[error("{node} rejected {operation}: {message}")]
    Rejected {
        node: NodeId,
        operation: String,
        message: String,
    },

    /// Transport or backend failure.
    #[error("device backend error on {node}: {message}")]
    Backend { node: NodeId, message: String },
}

impl DeviceError {
    /// Creates a not-mounted error.
    pub fn not_mounted(node: &NodeId) -> Self {
        Self::NotMounted { node: node.clone() }
    }

    /// Creates a rejected-request error.
    pub fn rejected(node: &NodeId, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            node: node.clone(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(node: &NodeId, message: impl Into<String>) -> Self {
        Self::Backend {
            node: node.clone(),
            message: message.into(),
        }
    }

    /// Returns true if the error is `NotMounted`.
    pub fn is_not_mounted(&self) -> bool {
        matches!(self, DeviceError::NotMounted { .. })
    }

    /// Returns true if the error is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeviceError::NotFound { .. })
    }
}

/// Configuration path of an object on a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DevicePath(String);

impl DevicePath {
    const INTERFACE_PREFIX: &'static str = "interface/";
    const CONNECTION_PREFIX: &'static str = "roadm-connections/";

    /// Path of a device interface.
    pub fn interface(name: &str) -> Self {
        DevicePath(format!("{}{}", Self::INTERFACE_PREFIX, name))
    }

    /// Path of a ROADM cross-connect.
    pub fn roadm_connection(name: &str) -> Self {
        DevicePath(format!("{}{}", Self::CONNECTION_PREFIX, name))
    }

    /// Path from a raw string.
    pub fn raw(path: impl Into<String>) -> Self {
        DevicePath(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the object name, without the interface or cross-connect prefix.
    pub fn name(&self) -> &str {
        self.0
            .strip_prefix(Self::INTERFACE_PREFIX)
            .or_else(|| self.0.strip_prefix(Self::CONNECTION_PREFIX))
            .unwrap_or(&self.0)
    }

    /// Returns true if this path addresses an interface.
    pub fn is_interface(&self) -> bool {
        self.0.starts_with(Self::INTERFACE_PREFIX)
    }

    /// Returns true if this path addresses a cross-connect.
    pub fn is_roadm_connection(&self) -> bool {
        self.0.starts_with(Self::CONNECTION_PREFIX)
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transactional access to mounted devices.
///
/// Implementations stage `write`/`delete` calls per node and apply them on
/// `commit`. Callers must hold the node's transaction slot (see
/// [`DeviceTransactionManager`](crate::DeviceTransactionManager)) for the
/// whole open → commit sequence.
#[async_trait]
pub trait DeviceAccess: Send + Sync {
    /// Opens a transaction on the node, failing with `NotMounted` if the
    /// device is unreachable.
    async fn open(&self, node: &NodeId) -> DeviceResult<()>;

    /// Reads the committed value at `path`.
    async fn read(&self, node: &NodeId, path: &DevicePath) -> DeviceResult<Option<serde_json::Value>>;

    /// Stages a write of `value` at `path`.
    async fn write(&self, node: &NodeId, path: &DevicePath, value: serde_json::Value) -> DeviceResult<()>;

    /// Stages a delete of `path`.
    async fn delete(&self, node: &NodeId, path: &DevicePath) -> DeviceResult<()>;

    /// Applies all staged changes on the node.
    async fn commit(&self, node: &NodeId) -> DeviceResult<()>;

    /// Drops all staged changes on the node.
    async fn discard(&self, node: &NodeId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_paths() {
        let path = DevicePath::interface("SRG1-PP1-TXRX-1");
        assert_eq!(path.as_str(), "interface/SRG1-PP1-TXRX-1");
        assert!(path.is_interface());
        assert!(!path.is_roadm_connection());

        let conn = DevicePath::roadm_connection("a-x-b");
        assert!(conn.is_roadm_connection());
    }

    #[test]
    fn test_not_mounted_message() {
        let err = DeviceError::not_mounted(&NodeId::from("node1"));
        assert_eq!(err.to_string(), "node1 is not mounted on the controller");
        assert!(err.is_not_mounted());
    }
}
