//! RendererServiceOperations implementation.

use std::sync::Arc;

use dashmap::DashMap;
use otn_orch_common::{
    audit_log, signal_is_clean, AuditCategory, AuditOutcome, AuditRecord, PowerManagement,
    PowerRequest,
};
use otn_types::{
    Direction, NodeId, NotificationEnvelope, NotificationKind, NotificationPayload, RpcStatus,
    ServicePath, TerminationPointRole,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::types::{
    ImplementationStage, ServiceDeleteOutcome, ServiceImplementationOutcome,
    ServiceOperationsConfig, ServiceRenderingRequest, TeardownStage, ACTIVATION_TEST_FAILED,
    OLM_SETUP_FAILED, OPERATION_IN_PROGRESS, OPERATION_SUCCESSFUL, POWER_TURNDOWN_FAILED,
    RENDERING_FAILED,
};
use crate::device_renderer::DeviceRenderer;
use crate::rollback::{
    DeviceRenderingRollbackTask, PowerSetupRollbackTask, RollbackHistory, RollbackProcessor,
};
use crate::types::{RollbackOutcome, ServicePathOutcome};

/// What an implemented service needs for later compensation.
#[derive(Debug)]
struct LedgerEntry {
    correlation_id: String,
    devices: RollbackHistory,
    power: Vec<PowerRequest>,
}

/// Saga controller for service implementation and deletion.
///
/// Every step reports its progress as a [`NotificationEnvelope`] on the
/// renderer topic. Implemented services are kept in a ledger until they
/// are deleted or compensated.
#[derive(Clone)]
pub struct RendererServiceOperations {
    renderer: DeviceRenderer,
    olm: Arc<dyn PowerManagement>,
    notifications: mpsc::Sender<NotificationEnvelope>,
    ledger: Arc<DashMap<String, LedgerEntry>>,
    config: ServiceOperationsConfig,
}

impl std::fmt::Debug for RendererServiceOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererServiceOperations")
            .field("config", &self.config)
            .field("ledger_count", &self.ledger.len())
            .finish()
    }
}

impl RendererServiceOperations {
    pub fn new(
        renderer: DeviceRenderer,
        olm: Arc<dyn PowerManagement>,
        notifications: mpsc::Sender<NotificationEnvelope>,
        config: ServiceOperationsConfig,
    ) -> Self {
        Self {
            renderer,
            olm,
            notifications,
            ledger: Arc::new(DashMap::new()),
            config,
        }
    }

    pub fn renderer(&self) -> &DeviceRenderer {
        &self.renderer
    }

    pub fn config(&self) -> &ServiceOperationsConfig {
        &self.config
    }

    /// Returns true if the service is implemented and not yet compensated.
    pub fn is_implemented(&self, service_name: &str) -> bool {
        self.ledger.contains_key(service_name)
    }

    /// Number of implemented services.
    pub fn implemented_count(&self) -> usize {
        self.ledger.len()
    }

    /// Runs [`service_implementation`](Self::service_implementation) on a
    /// new task.
    pub fn spawn_service_implementation(
        &self,
        request: ServiceRenderingRequest,
        is_temporary: bool,
    ) -> JoinHandle<ServiceImplementationOutcome> {
        let operations = self.clone();
        tokio::spawn(async move { operations.service_implementation(request, is_temporary).await })
    }

    /// Runs [`service_delete`](Self::service_delete) on a new task.
    pub fn spawn_service_delete(&self, request: ServiceRenderingRequest) -> JoinHandle<ServiceDeleteOutcome> {
        let operations = self.clone();
        tokio::spawn(async move { operations.service_delete(request).await })
    }

    /// Implements a service on the devices.
    ///
    /// Renders both directions concurrently, levels power, optionally checks
    /// the signal, and on any failure compensates everything done so far
    /// before reporting `Failed`.
    #[instrument(skip(self, request), fields(service = %request.service_name, correlation_id = %request.correlation_id))]
    pub async fn service_implementation(
        &self,
        request: ServiceRenderingRequest,
        is_temporary: bool,
    ) -> ServiceImplementationOutcome {
        self.notify(
            NotificationKind::ServiceImplementation,
            &request,
            RpcStatus::Pending,
            OPERATION_IN_PROGRESS,
            NotificationPayload::None,
        )
        .await;

        // Setup
        info!(stage = %ImplementationStage::Setup, "rendering both directions");
        let (az, za) = tokio::join!(
            self.renderer.setup_service_path(&request.path_az, Direction::AToZ),
            self.renderer.setup_service_path(&request.path_za, Direction::ZToA),
        );
        let az = az.unwrap_or_else(|e| ServicePathOutcome::failure(e.to_string(), Vec::new()));
        let za = za.unwrap_or_else(|e| ServicePathOutcome::failure(e.to_string(), Vec::new()));
        if !az.success {
            warn!(direction = %Direction::AToZ, result = %az.result, "rendering failed");
        }
        if !za.success {
            warn!(direction = %Direction::ZToA, result = %za.result, "rendering failed");
        }

        // Both directions share interfaces on every node, so they are
        // undone as one history.
        let mut processor = RollbackProcessor::new();
        processor.add_task(DeviceRenderingRollbackTask::new(
            "DeviceTask",
            !az.success || !za.success,
            RollbackHistory::combine([
                RollbackHistory::from_outcome(&az),
                RollbackHistory::from_outcome(&za),
            ]),
            self.renderer.clone(),
        ));
        if processor.rollback_all_if_necessary().await > 0 {
            return self
                .fail(&request, ImplementationStage::Setup, RENDERING_FAILED)
                .await;
        }

        // PowerSetup
        info!(stage = %ImplementationStage::PowerSetup, "leveling power");
        let power_az = PowerRequest::new(request.path_az.clone(), Direction::AToZ);
        let power_za = PowerRequest::new(request.path_za.clone(), Direction::ZToA);
        let (olm_az, olm_za) = tokio::join!(
            self.olm.power_setup(&power_az),
            self.olm.power_setup(&power_za),
        );
        for result in [&olm_az, &olm_za] {
            if let Err(e) = result {
                warn!(error = %e, "power setup failed");
            }
        }
        processor.add_task(PowerSetupRollbackTask::new(
            "AtoZOLMTask",
            olm_az.is_err(),
            power_az.clone(),
            Arc::clone(&self.olm),
        ));
        processor.add_task(PowerSetupRollbackTask::new(
            "ZtoAOLMTask",
            olm_za.is_err(),
            power_za.clone(),
            Arc::clone(&self.olm),
        ));
        if processor.rollback_all_if_necessary().await > 0 {
            return self
                .fail(&request, ImplementationStage::PowerSetup, OLM_SETUP_FAILED)
                .await;
        }

        // Verify
        if self.config.verify_signal {
            info!(stage = %ImplementationStage::Verify, "checking signal");
            if !self.verify_signal(&request.path_az).await {
                processor.rollback_all().await;
                return self
                    .fail(&request, ImplementationStage::Verify, ACTIVATION_TEST_FAILED)
                    .await;
            }
        }

        // Done
        self.ledger.insert(
            request.service_name.clone(),
            LedgerEntry {
                correlation_id: request.correlation_id.clone(),
                devices: RollbackHistory::combine([
                    RollbackHistory::from(az.node_interfaces),
                    RollbackHistory::from(za.node_interfaces),
                ]),
                power: vec![power_az, power_za],
            },
        );

        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "RendererServiceOperations",
            "service_implementation",
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_id(&request.service_name)
        .with_object_type("service")
        .with_correlation_id(&request.correlation_id)
        .with_details(serde_json::json!({ "is_temporary": is_temporary })));

        self.notify(
            NotificationKind::ServiceImplementation,
            &request,
            RpcStatus::Successful,
            OPERATION_SUCCESSFUL,
            NotificationPayload::Implemented { is_temporary },
        )
        .await;

        ServiceImplementationOutcome {
            service_name: request.service_name,
            success: true,
            message: OPERATION_SUCCESSFUL.to_string(),
            stage: ImplementationStage::Done,
        }
    }

    /// Removes a service from the devices.
    ///
    /// Power is turned down first; if that fails the device configuration is
    /// left in place and the deletion is reported as failed.
    #[instrument(skip(self, request), fields(service = %request.service_name, correlation_id = %request.correlation_id))]
    pub async fn service_delete(&self, request: ServiceRenderingRequest) -> ServiceDeleteOutcome {
        self.notify(
            NotificationKind::ServiceDelete,
            &request,
            RpcStatus::Pending,
            OPERATION_IN_PROGRESS,
            NotificationPayload::None,
        )
        .await;

        // PowerTurndown
        info!(stage = %TeardownStage::PowerTurndown, "turning power down");
        let power_az = PowerRequest::new(request.path_az.clone(), Direction::AToZ);
        let power_za = PowerRequest::new(request.path_za.clone(), Direction::ZToA);
        let (olm_az, olm_za) = tokio::join!(
            self.olm.power_turndown(&power_az),
            self.olm.power_turndown(&power_za),
        );
        if let Some(e) = olm_az.err().or(olm_za.err()) {
            error!(error = %e, "power turndown failed, leaving device configuration in place");
            return self
                .fail_delete(&request, TeardownStage::PowerTurndown, POWER_TURNDOWN_FAILED.to_string())
                .await;
        }

        // NodeTeardown
        info!(stage = %TeardownStage::NodeTeardown, "removing device configuration");
        let teardown = self
            .renderer
            .delete_service_paths(&[&request.path_az, &request.path_za])
            .await;
        let failure = match teardown {
            Ok(outcome) if outcome.success => None,
            Ok(outcome) => Some(outcome.result),
            Err(e) => Some(e.to_string()),
        };
        if let Some(message) = failure {
            return self
                .fail_delete(&request, TeardownStage::NodeTeardown, message)
                .await;
        }

        // Done
        self.ledger.remove(&request.service_name);

        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "RendererServiceOperations",
            "service_delete",
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_id(&request.service_name)
        .with_object_type("service")
        .with_correlation_id(&request.correlation_id));

        self.notify(
            NotificationKind::ServiceDelete,
            &request,
            RpcStatus::Successful,
            OPERATION_SUCCESSFUL,
            NotificationPayload::None,
        )
        .await;

        ServiceDeleteOutcome {
            service_name: request.service_name,
            success: true,
            message: OPERATION_SUCCESSFUL.to_string(),
            stage: TeardownStage::Done,
        }
    }

    /// Compensates an implemented service after a later failure.
    ///
    /// Takes the service's ledger entry, so a service is compensated at
    /// most once. Returns `None` when there was nothing left to undo.
    #[instrument(skip(self))]
    pub async fn rollback_and_fail(&self, service_name: &str) -> Option<RollbackOutcome> {
        let Some((_, entry)) = self.ledger.remove(service_name) else {
            debug!("no implemented state to compensate");
            return None;
        };

        for request in &entry.power {
            if let Err(e) = self.olm.power_turndown(request).await {
                warn!(direction = %request.direction, error = %e, "power turndown failed during rollback");
            }
        }

        let outcome = self.renderer.renderer_rollback(entry.devices).await;

        let record = AuditRecord::new(
            AuditCategory::Rollback,
            "RendererServiceOperations",
            "rollback_and_fail",
        )
        .with_object_id(service_name)
        .with_object_type("service")
        .with_correlation_id(&entry.correlation_id);
        if outcome.success {
            audit_log!(record.with_outcome(AuditOutcome::Success));
        } else {
            audit_log!(record.with_error(format!(
                "{} node(s) not fully rolled back",
                outcome.failed_to_rollback.len()
            )));
        }

        Some(outcome)
    }

    /// Polls the PM counters of the network ports at both ends of the path.
    async fn verify_signal(&self, path: &ServicePath) -> bool {
        let ends = network_ends(path);
        if ends.is_empty() {
            debug!("no network termination point on path, skipping signal check");
            return true;
        }

        for (node, tp) in ends {
            if !self.poll_clean_signal(&node, &tp).await {
                warn!(node = %node, tp = %tp, "signal check failed");
                return false;
            }
        }
        true
    }

    async fn poll_clean_signal(&self, node: &NodeId, tp: &str) -> bool {
        let attempts = self.config.pm_attempts.max(1);
        for attempt in 1..=attempts {
            match self.olm.get_pm(node, tp).await {
                Ok(measurements) if signal_is_clean(&measurements) => return true,
                Ok(_) => debug!(node = %node, tp, attempt, "uncorrectable FEC blocks present"),
                Err(e) => debug!(node = %node, tp, attempt, error = %e, "PM read failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.pm_interval).await;
            }
        }
        false
    }

    async fn fail(
        &self,
        request: &ServiceRenderingRequest,
        stage: ImplementationStage,
        message: &str,
    ) -> ServiceImplementationOutcome {
        error!(
            stage = %ImplementationStage::RollbackAndFail,
            failed_stage = %stage,
            message,
            "service implementation failed"
        );
        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "RendererServiceOperations",
            "service_implementation",
        )
        .with_object_id(&request.service_name)
        .with_object_type("service")
        .with_correlation_id(&request.correlation_id)
        .with_details(serde_json::json!({ "stage": stage.to_string() }))
        .with_error(message));

        self.notify(
            NotificationKind::ServiceImplementation,
            request,
            RpcStatus::Failed,
            message,
            NotificationPayload::None,
        )
        .await;

        ServiceImplementationOutcome {
            service_name: request.service_name.clone(),
            success: false,
            message: message.to_string(),
            stage,
        }
    }

    async fn fail_delete(
        &self,
        request: &ServiceRenderingRequest,
        stage: TeardownStage,
        message: String,
    ) -> ServiceDeleteOutcome {
        error!(stage = %stage, %message, "service delete failed");
        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "RendererServiceOperations",
            "service_delete",
        )
        .with_object_id(&request.service_name)
        .with_object_type("service")
        .with_correlation_id(&request.correlation_id)
        .with_error(&message));

        self.notify(
            NotificationKind::ServiceDelete,
            request,
            RpcStatus::Failed,
            &message,
            NotificationPayload::None,
        )
        .await;

        ServiceDeleteOutcome {
            service_name: request.service_name.clone(),
            success: false,
            message,
            stage,
        }
    }

    async fn notify(
        &self,
        kind: NotificationKind,
        request: &ServiceRenderingRequest,
        status: RpcStatus,
        message: &str,
        payload: NotificationPayload,
    ) {
        let envelope = NotificationEnvelope::new(
            kind,
            &request.service_name,
            status,
            message,
            &request.correlation_id,
        )
        .with_payload(payload);
        if self.notifications.send(envelope).await.is_err() {
            warn!(kind = %kind, status = %status, "renderer topic closed, notification dropped");
        }
    }
}

/// First and last network termination points along a path.
fn network_ends(path: &ServicePath) -> Vec<(NodeId, String)> {
    let network_tps: Vec<(NodeId, String)> = path
        .hops
        .iter()
        .flat_map(|hop| [hop.src(), hop.dest()].into_iter().flatten().map(move |tp| (&hop.node_id, tp)))
        .filter(|(_, tp)| matches!(TerminationPointRole::classify(tp), Ok(TerminationPointRole::Network)))
        .map(|(node, tp)| (node.clone(), tp.to_string()))
        .collect();

    let mut ends = Vec::new();
    if let Some(first) = network_tps.first() {
        ends.push(first.clone());
    }
    if let Some(last) = network_tps.last() {
        if ends.first() != Some(last) {
            ends.push(last.clone());
        }
    }
    ends
}

#[cfg(test)]
mod tests {
    use super::*;
    use otn_types::{Channel, PathHop};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_network_ends() {
        let path = ServicePath::new(
            "service1",
            Channel::Wavelength(1),
            vec![
                PathHop::new("XPDR-A1", "XPDR1-CLIENT1", "XPDR1-NETWORK1"),
                PathHop::new("ROADM-A1", "SRG1-PP1-TXRX", "DEG1-TTP-TXRX"),
                PathHop::new("XPDR-C1", "XPDR1-NETWORK1", "XPDR1-CLIENT1"),
            ],
        );
        assert_eq!(
            network_ends(&path),
            vec![
                (NodeId::from("XPDR-A1"), "XPDR1-NETWORK1".to_string()),
                (NodeId::from("XPDR-C1"), "XPDR1-NETWORK1".to_string()),
            ]
        );

        let roadm_only = ServicePath::new(
            "service1",
            Channel::Wavelength(1),
            vec![PathHop::new("ROADM-A1", "SRG1-PP1-TXRX", "DEG1-TTP-TXRX")],
        );
        assert!(network_ends(&roadm_only).is_empty());
    }
}
