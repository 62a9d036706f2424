//! Verification helpers for device state
//!
//! Provides assertion helpers over the in-memory device backend

use otn_orch_common::{DeviceOperation, DevicePath, InMemoryDevice};
use otn_types::NodeId;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected {path} on {node}, not found")]
    ObjectMissing { node: String, path: String },

    #[error("Expected {path} to be absent on {node}")]
    ObjectPresent { node: String, path: String },

    #[error("Expected {node} to carry no configuration, found {count} object(s)")]
    NodeNotClean { node: String, count: usize },

    #[error("Expected no device writes, found {count}")]
    UnexpectedWrites { count: usize },

    #[error("Cross-connect {connection} deleted on {node} after interface {interface}")]
    InterfaceDeletedFirst {
        node: String,
        interface: String,
        connection: String,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Device state verification helper
pub struct DeviceVerifier<'a> {
    device: &'a InMemoryDevice,
}

impl<'a> DeviceVerifier<'a> {
    /// Create a new verifier
    pub fn new(device: &'a InMemoryDevice) -> Self {
        Self { device }
    }

    /// Verify that an interface exists on a node
    pub fn assert_interface_exists(&self, node: &str, name: &str) -> VerifyResult<()> {
        self.assert_present(node, DevicePath::interface(name))
    }

    /// Verify that an interface does not exist on a node
    pub fn assert_interface_absent(&self, node: &str, name: &str) -> VerifyResult<()> {
        self.assert_absent(node, DevicePath::interface(name))
    }

    /// Verify that a cross-connect exists on a node
    pub fn assert_connection_exists(&self, node: &str, connection_id: &str) -> VerifyResult<()> {
        self.assert_present(node, DevicePath::roadm_connection(connection_id))
    }

    /// Verify that a node carries no configuration at all
    pub fn assert_node_clean(&self, node: &str) -> VerifyResult<()> {
        let count = self.device.paths(&NodeId::from(node)).len();
        if count > 0 {
            return Err(VerificationError::NodeNotClean {
                node: node.to_string(),
                count,
            });
        }
        Ok(())
    }

    /// Verify that no write, delete or commit reached the device
    pub fn assert_no_writes(&self) -> VerifyResult<()> {
        let count = self
            .device
            .calls()
            .iter()
            .filter(|c| {
                matches!(
                    c.operation,
                    DeviceOperation::Write | DeviceOperation::Delete | DeviceOperation::Commit
                )
            })
            .count();
        if count > 0 {
            return Err(VerificationError::UnexpectedWrites { count });
        }
        Ok(())
    }

    /// Verify that on a node every cross-connect delete since call `since`
    /// came before the first interface delete
    pub fn assert_connections_deleted_first(&self, node: &str, since: usize) -> VerifyResult<()> {
        let node_id = NodeId::from(node);
        let mut first_interface: Option<DevicePath> = None;
        for call in self.device.calls().into_iter().skip(since) {
            if call.node != node_id || call.operation != DeviceOperation::Delete {
                continue;
            }
            let Some(path) = call.path else { continue };
            if path.is_interface() {
                first_interface.get_or_insert(path);
            } else if let Some(interface) = &first_interface {
                return Err(VerificationError::InterfaceDeletedFirst {
                    node: node.to_string(),
                    interface: interface.name().to_string(),
                    connection: path.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Number of objects configured on a node
    pub fn object_count(&self, node: &str) -> usize {
        self.device.paths(&NodeId::from(node)).len()
    }

    fn assert_present(&self, node: &str, path: DevicePath) -> VerifyResult<()> {
        if !self.device.contains(&NodeId::from(node), &path) {
            return Err(VerificationError::ObjectMissing {
                node: node.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn assert_absent(&self, node: &str, path: DevicePath) -> VerifyResult<()> {
        if self.device.contains(&NodeId::from(node), &path) {
            return Err(VerificationError::ObjectPresent {
                node: node.to_string(),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}
