//! ROADM cross-connect management.

use otn_orch_common::{
    audit_log, AuditCategory, AuditOutcome, AuditRecord, DeviceError, DevicePath,
    DeviceTransactionManager,
};
use otn_types::{Channel, NodeId};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Builds the cross-connect id joining two interfaces.
pub fn connection_name(src_interface: &str, dst_interface: &str) -> String {
    format!("{}-x-{}", src_interface, dst_interface)
}

/// Creates and deletes cross-connects between two interfaces of a node.
///
/// Failures are reported as absent values rather than errors: the caller
/// only needs to know whether the connection exists.
#[derive(Clone)]
pub struct CrossConnectManager {
    transactions: Arc<DeviceTransactionManager>,
}

impl CrossConnectManager {
    pub fn new(transactions: Arc<DeviceTransactionManager>) -> Self {
        Self { transactions }
    }

    /// Creates a cross-connect and returns its id, or `None` if the device
    /// refused it.
    #[instrument(skip(self), fields(node = %node_id))]
    pub async fn create_cross_connect(
        &self,
        node_id: &NodeId,
        src_interface: &str,
        dst_interface: &str,
        channel: Channel,
    ) -> Option<String> {
        let name = connection_name(src_interface, dst_interface);
        let body = serde_json::json!({
            "connection-name": name,
            "opticalControlMode": "off",
            "channel": channel.to_string(),
            "source": { "src-if": src_interface },
            "destination": { "dst-if": dst_interface },
        });
        let path = DevicePath::roadm_connection(&name);

        let result = async {
            let tx = self.transactions.begin(node_id).await?;
            tx.put(&path, body).await?;
            tx.commit().await
        }
        .await;

        match result {
            Ok(()) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceCreate,
                    "CrossConnectManager",
                    "create_cross_connect",
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(&name)
                .with_object_type("roadm-connection")
                .with_details(serde_json::json!({ "node": node_id.as_str() })));
                Some(name)
            }
            Err(e) => {
                warn!(connection = %name, error = %e, "cross-connect not created");
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceCreate,
                    "CrossConnectManager",
                    "create_cross_connect",
                )
                .with_object_id(&name)
                .with_object_type("roadm-connection")
                .with_error(e.to_string()));
                None
            }
        }
    }

    /// Deletes a cross-connect. Returns false if it was not deleted, which
    /// includes the connection not existing.
    #[instrument(skip(self), fields(node = %node_id))]
    pub async fn delete_cross_connect(&self, node_id: &NodeId, connection_id: &str) -> bool {
        let path = DevicePath::roadm_connection(connection_id);

        let result = async {
            let tx = self.transactions.begin(node_id).await?;
            tx.delete(&path).await?;
            tx.commit().await
        }
        .await;

        match result {
            Ok(()) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceDelete,
                    "CrossConnectManager",
                    "delete_cross_connect",
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(connection_id)
                .with_object_type("roadm-connection"));
                true
            }
            Err(e) => {
                warn!(connection = connection_id, error = %e, "cross-connect not deleted");
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceDelete,
                    "CrossConnectManager",
                    "delete_cross_connect",
                )
                .with_object_id(connection_id)
                .with_object_type("roadm-connection")
                .with_error(e.to_string()));
                false
            }
        }
    }

    /// Reads a cross-connect back from the device.
    pub async fn get_cross_connect(
        &self,
        node_id: &NodeId,
        connection_id: &str,
    ) -> Result<Option<serde_json::Value>, DeviceError> {
        let tx = self.transactions.begin(node_id).await?;
        let value = tx.read(&DevicePath::roadm_connection(connection_id)).await;
        tx.cancel().await;
        value
    }
}
