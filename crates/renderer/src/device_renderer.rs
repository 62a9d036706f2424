//! Per-node path setup, teardown and rollback.
//!
//! ```text
//! ServicePath ──> plan (per hop) ──> pre-flight mount check
//!                                         │
//!                      ┌──────────────────┼──────────────────┐
//!                      ▼                  ▼                  ▼
//!                   node 1             node 2      ...    node N     (bounded pool)
//!              interfaces, xc     interfaces, xc      interfaces, xc
//!                      │                  │                  │
//!                      └──────> NodeInterfaceRecord per node <┘
//! ```
//!
//! Every node is an independent configuration target, so nodes are worked
//! on in parallel up to `max_parallel_nodes`. Within a node the interfaces
//! are created in role order (source tp, destination tp) followed by the
//! cross-connect, and the record keeps that order for teardown.

use crate::crossconnect::{connection_name, CrossConnectManager};
use crate::error::RendererError;
use crate::interfaces::{InterfaceParams, InterfaceProvisioner};
use crate::rollback::RollbackHistory;
use crate::types::{
    merge_by_node, CreatedInterface, FailedToRollback, NodeInterfaceRecord, RollbackOutcome,
    ServicePathOutcome, CONNECTIONS_CREATED_PREFIX, REQUEST_PROCESSED,
};
use otn_orch_common::{audit_log, AuditCategory, AuditOutcome, AuditRecord, DeviceTransactionManager};
use otn_types::{Channel, Direction, InterfaceKind, NodeId, ParseError, PathHop, ServicePath, TerminationPointRole};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Default number of nodes provisioned concurrently.
pub const DEFAULT_MAX_PARALLEL_NODES: usize = 8;

/// Device renderer configuration.
#[derive(Debug, Clone)]
pub struct DeviceRendererConfig {
    /// Upper bound on nodes worked on at the same time
    pub max_parallel_nodes: usize,
}

impl Default for DeviceRendererConfig {
    fn default() -> Self {
        Self {
            max_parallel_nodes: DEFAULT_MAX_PARALLEL_NODES,
        }
    }
}

/// What one hop requires on its node.
#[derive(Debug, Clone)]
struct NodePlan {
    node_id: NodeId,
    interfaces: Vec<CreatedInterface>,
    /// Optical-channel interfaces to join, source first
    cross_connect: Option<(String, String)>,
}

impl NodePlan {
    fn for_hop(hop: &PathHop, channel: &Channel) -> Result<Self, ParseError> {
        let (src_role, dst_role) = hop.roles()?;

        let mut interfaces: Vec<CreatedInterface> = Vec::new();
        for (tp, role) in [(hop.src(), src_role), (hop.dest(), dst_role)] {
            let (Some(tp), Some(role)) = (tp, role) else {
                continue;
            };
            // a tp used on both sides is provisioned once
            if interfaces.iter().any(|i| i.tp == tp) {
                continue;
            }
            for kind in role.interface_kinds() {
                interfaces.push(CreatedInterface {
                    name: kind.interface_name(tp, channel),
                    kind: *kind,
                    tp: tp.to_string(),
                });
            }
        }

        let cross_connect = match (hop.src(), hop.dest()) {
            (Some(src), Some(dst)) if TerminationPointRole::needs_cross_connect(src_role, dst_role) => Some((
                InterfaceKind::OpticalChannel.interface_name(src, channel),
                InterfaceKind::OpticalChannel.interface_name(dst, channel),
            )),
            _ => None,
        };

        Ok(Self {
            node_id: hop.node_id.clone(),
            interfaces,
            cross_connect,
        })
    }

    /// Record of everything this plan creates, as if setup had succeeded.
    fn planned_record(&self) -> NodeInterfaceRecord {
        let mut record = NodeInterfaceRecord::new(self.node_id.clone());
        for iface in &self.interfaces {
            record.push_interface(iface.name.clone(), iface.kind, iface.tp.clone());
        }
        if let Some((src, dst)) = &self.cross_connect {
            record.push_connection(connection_name(src, dst));
        }
        record
    }
}

/// Result of setting up one node; the record is kept even on failure.
struct NodeSetup {
    record: NodeInterfaceRecord,
    error: Option<RendererError>,
}

/// Which kind of teardown is running, and so which absences it tolerates.
///
/// An interface already gone is never a failure: interfaces are shared by
/// the two directions of a service and one teardown may have removed it.
/// A missing cross-connect differs by mode. A rollback walks the history of
/// what its own attempt created, so a cross-connect that vanished means the
/// device diverged and is reported. A path deletion derives its objects
/// from the path and may retry an earlier partial deletion, so a missing
/// cross-connect is already deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownMode {
    Rollback,
    Delete,
}

impl TeardownMode {
    fn tolerates_missing_connection(self) -> bool {
        self == TeardownMode::Delete
    }
}

/// An object teardown could not remove.
struct TeardownFailure {
    object: String,
    message: String,
}

/// Provisions and removes the device configuration of service paths.
#[derive(Clone)]
pub struct DeviceRenderer {
    transactions: Arc<DeviceTransactionManager>,
    interfaces: InterfaceProvisioner,
    cross_connects: CrossConnectManager,
    config: DeviceRendererConfig,
}

impl DeviceRenderer {
    pub fn new(transactions: Arc<DeviceTransactionManager>, config: DeviceRendererConfig) -> Self {
        Self {
            interfaces: InterfaceProvisioner::new(Arc::clone(&transactions)),
            cross_connects: CrossConnectManager::new(Arc::clone(&transactions)),
            transactions,
            config,
        }
    }

    pub fn config(&self) -> &DeviceRendererConfig {
        &self.config
    }

    pub fn interfaces(&self) -> &InterfaceProvisioner {
        &self.interfaces
    }

    pub fn cross_connects(&self) -> &CrossConnectManager {
        &self.cross_connects
    }

    /// Provisions one direction of a service.
    ///
    /// Returns `Err` only for a malformed path. Device failures are reported
    /// in the outcome together with the records of everything created, the
    /// failing node's partial record included, so the caller can roll back.
    #[instrument(skip(self, path), fields(service = %path.service_name, direction = %direction))]
    pub async fn setup_service_path(
        &self,
        path: &ServicePath,
        direction: Direction,
    ) -> Result<ServicePathOutcome, RendererError> {
        let plans = Self::plan(path)?;
        if plans.is_empty() {
            debug!("no termination points on path, nothing to provision");
            return Ok(ServicePathOutcome::success(REQUEST_PROCESSED, Vec::new()));
        }

        let nodes: Vec<&NodeId> = plans.iter().map(|p| &p.node_id).collect();
        if let Some(message) = self.unmounted_nodes(nodes).await {
            warn!(%message, "path setup aborted");
            return Ok(ServicePathOutcome::failure(message, Vec::new()));
        }

        let channel = path.channel;
        let results = self
            .fan_out(plans, move |renderer, plan| async move {
                renderer.setup_node(plan, channel).await
            })
            .await;

        let mut records = Vec::with_capacity(results.len());
        let mut provisioned = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(NodeSetup { record, error: None }) => {
                    provisioned.push(record.node_id().to_string());
                    records.push(record);
                }
                Ok(NodeSetup {
                    record,
                    error: Some(e),
                }) => {
                    errors.push(e.to_string());
                    records.push(record);
                }
                Err(message) => errors.push(message),
            }
        }

        if errors.is_empty() {
            let message = format!("{}{}", CONNECTIONS_CREATED_PREFIX, provisioned.join(", "));
            info!(%message, "path setup complete");
            Ok(ServicePathOutcome::success(message, records))
        } else {
            error!(failed = errors.len(), "path setup failed");
            Ok(ServicePathOutcome::failure(errors.join("\n"), records))
        }
    }

    /// Removes the device configuration of one direction of a service.
    ///
    /// What to delete is derived from the path itself, so no setup history
    /// is needed. Objects already absent are not an error; anything the
    /// device refuses to delete makes the outcome fail.
    #[instrument(skip(self, path), fields(service = %path.service_name))]
    pub async fn delete_service_path(&self, path: &ServicePath) -> Result<ServicePathOutcome, RendererError> {
        self.delete_service_paths(&[path]).await
    }

    /// Removes the device configuration of several paths at once.
    ///
    /// Used for both directions of a service: their records are merged per
    /// node, so on every node all cross-connects are deleted before the
    /// interfaces they share.
    #[instrument(skip_all, fields(paths = paths.len()))]
    pub async fn delete_service_paths(&self, paths: &[&ServicePath]) -> Result<ServicePathOutcome, RendererError> {
        let mut plans = Vec::new();
        for path in paths {
            plans.extend(Self::plan(path)?);
        }
        if plans.is_empty() {
            return Ok(ServicePathOutcome::success(REQUEST_PROCESSED, Vec::new()));
        }

        let records = merge_by_node(plans.iter().map(NodePlan::planned_record));
        if let Some(message) = self.unmounted_nodes(records.iter().map(NodeInterfaceRecord::node_id)).await {
            warn!(%message, "path teardown aborted");
            return Ok(ServicePathOutcome::failure(message, Vec::new()));
        }

        let results = self
            .fan_out(records, |renderer, record| async move {
                renderer.teardown_record(&record, TeardownMode::Delete).await
            })
            .await;

        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(failures) => errors.extend(failures.into_iter().map(|f| f.message)),
                Err(message) => errors.push(message),
            }
        }

        if errors.is_empty() {
            info!("path teardown complete");
            Ok(ServicePathOutcome::success(REQUEST_PROCESSED, Vec::new()))
        } else {
            error!(failed = errors.len(), "path teardown failed");
            Ok(ServicePathOutcome::failure(errors.join("\n"), Vec::new()))
        }
    }

    /// Compensates a setup attempt.
    ///
    /// Records are merged per node and torn down one node at a time, last
    /// node first. Objects that cannot be removed are reported in the
    /// outcome, never raised.
    pub async fn renderer_rollback(&self, history: RollbackHistory) -> RollbackOutcome {
        let mut failed = Vec::new();

        for record in merge_by_node(history.into_records()).into_iter().rev() {
            if record.is_empty() {
                continue;
            }
            let failures = self.teardown_record(&record, TeardownMode::Rollback).await;
            if !failures.is_empty() {
                failed.push(FailedToRollback {
                    node_id: record.node_id().clone(),
                    interfaces: failures.into_iter().map(|f| f.object).collect(),
                });
            }
        }

        let outcome = RollbackOutcome::from_failures(failed);
        let record = AuditRecord::new(AuditCategory::Rollback, "DeviceRenderer", "renderer_rollback");
        if outcome.success {
            audit_log!(record.with_outcome(AuditOutcome::Success));
        } else {
            let nodes: Vec<&str> = outcome
                .failed_to_rollback
                .iter()
                .map(|f| f.node_id.as_str())
                .collect();
            audit_log!(record
                .with_details(serde_json::json!({ "nodes": nodes }))
                .with_error("configuration left behind"));
        }
        outcome
    }

    fn plan(path: &ServicePath) -> Result<Vec<NodePlan>, RendererError> {
        path.validate()?;
        path.hops
            .iter()
            .filter(|hop| !hop.is_noop())
            .map(|hop| NodePlan::for_hop(hop, &path.channel).map_err(RendererError::from))
            .collect()
    }

    /// Returns the not-mounted message for every unreachable node, if any.
    async fn unmounted_nodes<'a>(&self, nodes: impl IntoIterator<Item = &'a NodeId>) -> Option<String> {
        let mut messages = Vec::new();
        for node in nodes {
            if !self.transactions.is_mounted(node).await {
                messages.push(RendererError::NodeNotMounted { node: node.clone() }.to_string());
            }
        }
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("\n"))
        }
    }

    async fn setup_node(&self, plan: NodePlan, channel: Channel) -> NodeSetup {
        let params = InterfaceParams::new(channel);
        let mut record = NodeInterfaceRecord::new(plan.node_id.clone());

        for iface in &plan.interfaces {
            match self
                .interfaces
                .create_interface(&plan.node_id, &iface.tp, iface.kind, &params)
                .await
            {
                Ok(name) => record.push_interface(name, iface.kind, iface.tp.clone()),
                Err(e) => {
                    error!(node = %plan.node_id, error = %e, "interface creation failed");
                    return NodeSetup {
                        record,
                        error: Some(e.into()),
                    };
                }
            }
        }

        if let Some((src, dst)) = &plan.cross_connect {
            match self
                .cross_connects
                .create_cross_connect(&plan.node_id, src, dst, channel)
                .await
            {
                Some(id) => record.push_connection(id),
                None => {
                    return NodeSetup {
                        record,
                        error: Some(RendererError::CrossConnectRefused {
                            node: plan.node_id.clone(),
                            src: src.clone(),
                            dst: dst.clone(),
                        }),
                    };
                }
            }
        }

        NodeSetup { record, error: None }
    }

    /// Removes cross-connects, then interfaces in reverse creation order.
    async fn teardown_record(&self, record: &NodeInterfaceRecord, mode: TeardownMode) -> Vec<TeardownFailure> {
        let node = record.node_id();
        let mut failures = Vec::new();

        for id in record.connection_ids().iter().rev() {
            if self.cross_connects.delete_cross_connect(node, id).await {
                continue;
            }
            let absent = mode.tolerates_missing_connection()
                && matches!(self.cross_connects.get_cross_connect(node, id).await, Ok(None));
            if absent {
                debug!(connection = %id, "cross-connect already absent");
            } else {
                failures.push(TeardownFailure {
                    object: id.clone(),
                    message: format!("failed to delete cross-connect {} on {}", id, node),
                });
            }
        }

        for iface in record.interfaces().iter().rev() {
            match self.interfaces.delete_interface(node, &iface.name).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => failures.push(TeardownFailure {
                    object: iface.name.clone(),
                    message: e.to_string(),
                }),
            }
        }

        failures
    }

    /// Runs `work` for every item on the bounded node pool and returns the
    /// results in input order.
    async fn fan_out<I, T, F, Fut>(&self, items: Vec<I>, work: F) -> Vec<Result<T, String>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(DeviceRenderer, I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.config.max_parallel_nodes.max(1)));
        let mut workers = JoinSet::new();
        let count = items.len();

        for (index, item) in items.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let job = work(self.clone(), item);
            workers.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, job.await)
            });
        }

        let mut results: Vec<Option<T>> = (0..count).map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, value)) => results[index] = Some(value),
                Err(e) => error!(error = %e, "node worker aborted"),
            }
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| "node worker aborted".to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otn_orch_common::{DeviceOperation, DevicePath, Fault, InMemoryDevice};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn renderer(device: &Arc<InMemoryDevice>) -> DeviceRenderer {
        let device: Arc<InMemoryDevice> = Arc::clone(device);
        let transactions = Arc::new(DeviceTransactionManager::new(device, Duration::from_millis(200)));
        DeviceRenderer::new(transactions, DeviceRendererConfig::default())
    }

    fn roadm_path(nodes: &[&str]) -> ServicePath {
        ServicePath::new(
            "service1",
            Channel::Wavelength(1),
            nodes
                .iter()
                .map(|n| PathHop::new(*n, "SRG1-PP1-TXRX", "DEG1-TTP-TXRX"))
                .collect(),
        )
    }

    /// Asserts that on `node` no cross-connect was deleted after an interface.
    fn assert_connections_deleted_first(device: &InMemoryDevice, since: usize, node: &str) {
        let deletes: Vec<DevicePath> = device.calls()[since..]
            .iter()
            .filter(|c| c.operation == DeviceOperation::Delete && c.node == NodeId::from(node))
            .filter_map(|c| c.path.clone())
            .collect();
        let connections = deletes.iter().filter(|p| p.is_roadm_connection()).count();
        assert_eq!(connections, 2, "{:?}", deletes);
        assert!(
            deletes[..connections].iter().all(DevicePath::is_roadm_connection),
            "{:?}",
            deletes
        );
    }

    async fn setup_both_directions(renderer: &DeviceRenderer, nodes: &[&str]) -> (ServicePath, ServicePath) {
        let az = roadm_path(nodes);
        let za = az.reversed();
        for (path, direction) in [(&az, Direction::AToZ), (&za, Direction::ZToA)] {
            assert!(renderer.setup_service_path(path, direction).await.unwrap().success);
        }
        (az, za)
    }

    #[test]
    fn test_plan_transponder_hop() {
        let hop = PathHop::new("XPDR-A1", "XPDR1-CLIENT1", "XPDR1-NETWORK1");
        let plan = NodePlan::for_hop(&hop, &Channel::Wavelength(2)).unwrap();
        let names: Vec<_> = plan.interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "XPDR1-CLIENT1-ETHERNET",
                "XPDR1-NETWORK1-2",
                "XPDR1-NETWORK1-OTU",
                "XPDR1-NETWORK1-ODU"
            ]
        );
        assert!(plan.cross_connect.is_none());
    }

    #[test]
    fn test_plan_roadm_hop() {
        let hop = PathHop::new("ROADM-A1", "SRG1-PP1-TXRX", "DEG1-TTP-TXRX");
        let record = NodePlan::for_hop(&hop, &Channel::Wavelength(2))
            .unwrap()
            .planned_record();
        assert_eq!(record.interfaces().len(), 2);
        assert_eq!(
            record.connection_ids(),
            &["SRG1-PP1-TXRX-2-x-DEG1-TTP-TXRX-2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_setup_partial_record_is_kept() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        device.inject_fault(Fault::on(DeviceOperation::Write).matching("DEG1-TTP-TXRX"));
        let renderer = renderer(&device);

        let outcome = renderer
            .setup_service_path(&roadm_path(&["node1"]), Direction::AToZ)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.node_interfaces.len(), 1);
        let record = &outcome.node_interfaces[0];
        assert!(record.contains_interface("SRG1-PP1-TXRX-1"));
        assert!(record.connection_ids().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_removes_in_reverse_order() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1", "node2"]));
        let renderer = renderer(&device);

        let outcome = renderer
            .setup_service_path(&roadm_path(&["node1", "node2"]), Direction::AToZ)
            .await
            .unwrap();
        assert!(outcome.success);

        let before = device.call_count();
        let rollback = renderer
            .renderer_rollback(RollbackHistory::from(outcome.node_interfaces))
            .await;
        assert!(rollback.success);
        assert!(device.paths(&NodeId::from("node1")).is_empty());
        assert!(device.paths(&NodeId::from("node2")).is_empty());

        let first_delete = device.calls()[before..]
            .iter()
            .find(|c| c.operation == DeviceOperation::Delete)
            .cloned()
            .unwrap();
        assert_eq!(first_delete.node, NodeId::from("node2"));
        assert_eq!(
            first_delete.path,
            Some(DevicePath::roadm_connection("SRG1-PP1-TXRX-1-x-DEG1-TTP-TXRX-1"))
        );
    }

    #[tokio::test]
    async fn test_both_directions_delete_connections_before_interfaces() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1", "node2"]));
        let renderer = renderer(&device);
        let (az, za) = setup_both_directions(&renderer, &["node1", "node2"]).await;
        assert_eq!(device.paths(&NodeId::from("node1")).len(), 4);

        let before = device.call_count();
        let outcome = renderer.delete_service_paths(&[&az, &za]).await.unwrap();

        assert!(outcome.success, "{}", outcome.result);
        for node in ["node1", "node2"] {
            assert_connections_deleted_first(&device, before, node);
            assert!(device.paths(&NodeId::from(node)).is_empty());
        }
    }

    #[tokio::test]
    async fn test_combined_rollback_deletes_connections_before_interfaces() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        let renderer = renderer(&device);
        let az = roadm_path(&["node1"]);
        let za = az.reversed();
        let mut histories = Vec::new();
        for (path, direction) in [(&az, Direction::AToZ), (&za, Direction::ZToA)] {
            let outcome = renderer.setup_service_path(path, direction).await.unwrap();
            histories.push(RollbackHistory::from_outcome(&outcome));
        }

        let before = device.call_count();
        let rollback = renderer
            .renderer_rollback(RollbackHistory::combine(histories))
            .await;

        assert!(rollback.success);
        assert_connections_deleted_first(&device, before, "node1");
        assert!(device.paths(&NodeId::from("node1")).is_empty());
    }

    #[tokio::test]
    async fn test_repeated_delete_tolerates_missing_connections() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        let renderer = renderer(&device);
        let path = roadm_path(&["node1"]);
        let outcome = renderer
            .setup_service_path(&path, Direction::AToZ)
            .await
            .unwrap();
        let history = RollbackHistory::from_outcome(&outcome);

        assert!(renderer.delete_service_path(&path).await.unwrap().success);
        let again = renderer.delete_service_path(&path).await.unwrap();
        assert!(again.success, "{}", again.result);

        // a rollback still reports the cross-connect it created and lost
        let rollback = renderer.renderer_rollback(history).await;
        assert!(!rollback.success);
        assert_eq!(
            rollback.failed_to_rollback[0].interfaces,
            vec!["SRG1-PP1-TXRX-1-x-DEG1-TTP-TXRX-1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_tp_is_rejected_before_device_access() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        let renderer = renderer(&device);
        let path = ServicePath::new(
            "service1",
            Channel::Wavelength(1),
            vec![PathHop::new("node1", "eth0", "DEG1-TTP-TXRX")],
        );

        let err = renderer
            .setup_service_path(&path, Direction::AToZ)
            .await
            .unwrap_err();
        assert!(err.is_invalid_request());
        assert_eq!(device.call_count(), 0);
    }
}
