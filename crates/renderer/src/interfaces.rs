//! Device interface provisioning.

use crate::error::InterfaceError;
use otn_orch_common::{
    audit_log, AuditCategory, AuditOutcome, AuditRecord, DeviceError, DevicePath,
    DeviceTransactionManager,
};
use otn_types::{Channel, InterfaceKind, NodeId};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Administrative state written into new interfaces.
const ADMIN_STATE_IN_SERVICE: &str = "inService";

/// Parameters of an interface to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceParams {
    pub channel: Channel,
}

impl InterfaceParams {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

/// Creates and deletes named, typed interfaces on a node.
///
/// Each call runs in its own device transaction. Creating an interface that
/// already exists overwrites it with the same content.
#[derive(Clone)]
pub struct InterfaceProvisioner {
    transactions: Arc<DeviceTransactionManager>,
}

impl InterfaceProvisioner {
    pub fn new(transactions: Arc<DeviceTransactionManager>) -> Self {
        Self { transactions }
    }

    /// Creates the interface of `kind` on `tp_id` and returns its name.
    #[instrument(skip_all, fields(node = %node_id, tp = %tp_id, kind = %kind))]
    pub async fn create_interface(
        &self,
        node_id: &NodeId,
        tp_id: &str,
        kind: InterfaceKind,
        params: &InterfaceParams,
    ) -> Result<String, InterfaceError> {
        let name = kind.interface_name(tp_id, &params.channel);
        let path = DevicePath::interface(&name);
        let body = serde_json::json!({
            "name": name,
            "type": kind.device_type(),
            "supporting-port": tp_id,
            "channel": params.channel.to_string(),
            "administrative-state": ADMIN_STATE_IN_SERVICE,
        });

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
                    "InterfaceProvisioner",
                    "create_interface",
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(&name)
                .with_object_type(kind.to_string())
                .with_details(serde_json::json!({ "node": node_id.as_str(), "tp": tp_id })));
                Ok(name)
            }
            Err(source) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceCreate,
                    "InterfaceProvisioner",
                    "create_interface",
                )
                .with_object_id(&name)
                .with_object_type(kind.to_string())
                .with_error(source.to_string()));
                Err(InterfaceError::Create {
                    node: node_id.clone(),
                    name,
                    source,
                })
            }
        }
    }

    /// Deletes an interface by name.
    ///
    /// An absent interface is reported as [`InterfaceError::NotFound`].
    #[instrument(skip(self), fields(node = %node_id))]
    pub async fn delete_interface(&self, node_id: &NodeId, interface_id: &str) -> Result<(), InterfaceError> {
        let path = DevicePath::interface(interface_id);

        let result = async {
            let tx = self.transactions.begin(node_id).await?;
            if tx.read(&path).await?.is_none() {
                tx.cancel().await;
                return Err(DeviceError::NotFound {
                    node: node_id.clone(),
                    path: path.clone(),
                });
            }
            tx.delete(&path).await?;
            tx.commit().await
        }
        .await;

        match result {
            Ok(()) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceDelete,
                    "InterfaceProvisioner",
                    "delete_interface",
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(interface_id)
                .with_details(serde_json::json!({ "node": node_id.as_str() })));
                Ok(())
            }
            Err(DeviceError::NotFound { .. }) => {
                debug!(interface = interface_id, "interface already absent");
                Err(InterfaceError::NotFound {
                    node: node_id.clone(),
                    name: interface_id.to_string(),
                })
            }
            Err(source) => {
                audit_log!(AuditRecord::new(
                    AuditCategory::ResourceDelete,
                    "InterfaceProvisioner",
                    "delete_interface",
                )
                .with_object_id(interface_id)
                .with_error(source.to_string()));
                Err(InterfaceError::Delete {
                    node: node_id.clone(),
                    name: interface_id.to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otn_orch_common::{DeviceOperation, Fault, InMemoryDevice};
    use std::time::Duration;

    fn provisioner(device: &Arc<InMemoryDevice>) -> InterfaceProvisioner {
        let device: Arc<InMemoryDevice> = Arc::clone(device);
        InterfaceProvisioner::new(Arc::new(DeviceTransactionManager::new(
            device,
            Duration::from_secs(1),
        )))
    }

    #[tokio::test]
    async fn test_create_and_delete_interface() {
        let device = Arc::new(InMemoryDevice::with_nodes(["ROADM-A1"]));
        let provisioner = provisioner(&device);
        let node = NodeId::from("ROADM-A1");
        let params = InterfaceParams::new(Channel::Wavelength(3));

        let name = provisioner
            .create_interface(&node, "SRG1-PP1-TXRX", InterfaceKind::OpticalChannel, &params)
            .await
            .unwrap();
        assert_eq!(name, "SRG1-PP1-TXRX-3");

        let body = device.get(&node, &DevicePath::interface(&name)).unwrap();
        assert_eq!(body["type"], "opticalChannel");
        assert_eq!(body["supporting-port"], "SRG1-PP1-TXRX");

        provisioner.delete_interface(&node, &name).await.unwrap();
        assert!(!device.contains(&node, &DevicePath::interface(&name)));

        let err = provisioner.delete_interface(&node, &name).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_on_unmounted_node() {
        let device = Arc::new(InMemoryDevice::with_nodes(["ROADM-A1"]));
        let provisioner = provisioner(&device);
        let err = provisioner
            .create_interface(
                &NodeId::from("ROADM-Z1"),
                "DEG1-TTP-TXRX",
                InterfaceKind::OpticalChannel,
                &InterfaceParams::new(Channel::Wavelength(1)),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_mounted());
    }

    #[tokio::test]
    async fn test_rejected_commit_leaves_nothing() {
        let device = Arc::new(InMemoryDevice::with_nodes(["XPDR-A1"]));
        device.inject_fault(Fault::on(DeviceOperation::Commit));
        let provisioner = provisioner(&device);
        let node = NodeId::from("XPDR-A1");

        let err = provisioner
            .create_interface(
                &node,
                "XPDR1-NETWORK1",
                InterfaceKind::LineSignal,
                &InterfaceParams::new(Channel::Wavelength(1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InterfaceError::Create { .. }));
        assert!(device.paths(&node).is_empty());
    }
}
