//! Notification sequencer.
//!
//! Consumes path-computation and renderer notifications and turns each one
//! into at most one service transition.
//!
//! # Deduplication
//!
//! Every correlation scope remembers the last envelope it processed. An
//! envelope equal to it (kind, service name, status and status message) is
//! dropped. The per-scope slot is a `tokio::sync::Mutex` held from the
//! comparison until the envelope is fully handled, so envelopes of one
//! scope are processed one at a time, any triggered rollback included.
//! Distinct scopes proceed independently.
//!
//! Scopes live as long as their service: once a service is deleted every
//! scope opened for it is dropped, unless another envelope is still
//! waiting on it.

use crate::datastore::{ServiceDataStore, ServiceState};
use crate::publisher::{ServiceStatusReport, StatusPublisher};
use dashmap::DashMap;
use otn_orch_common::{audit_log, AuditCategory, AuditOutcome, AuditRecord};
use otn_renderer::{RendererServiceOperations, ServiceRenderingRequest};
use otn_types::{NotificationEnvelope, NotificationKind, NotificationPayload, RpcStatus, ServicePath};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// What an envelope did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Equal to the last envelope of its scope; ignored
    Duplicate,
    /// Progress report; nothing to do
    Pending,
    /// Path computed, device implementation spawned
    ImplementationStarted,
    /// Resources released, device teardown spawned
    DeletionStarted,
    ServiceInService,
    ServiceDeleted,
    /// Implementation, teardown or release failed
    ServiceFailed,
    PathComputationFailed,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Transition::Duplicate => "duplicate",
            Transition::Pending => "pending",
            Transition::ImplementationStarted => "implementation-started",
            Transition::DeletionStarted => "deletion-started",
            Transition::ServiceInService => "in-service",
            Transition::ServiceDeleted => "deleted",
            Transition::ServiceFailed => "failed",
            Transition::PathComputationFailed => "path-computation-failed",
        };
        write!(f, "{}", s)
    }
}

/// Last envelope processed in one correlation scope.
#[derive(Debug)]
struct Scope {
    service_name: String,
    last: Mutex<Option<NotificationEnvelope>>,
}

type ScopeSlot = Arc<Scope>;

/// Drives services from notifications.
pub struct NotificationSequencer {
    last_seen: DashMap<String, ScopeSlot>,
    operations: RendererServiceOperations,
    datastore: Arc<dyn ServiceDataStore>,
    publisher: Arc<StatusPublisher>,
}

impl NotificationSequencer {
    pub fn new(
        operations: RendererServiceOperations,
        datastore: Arc<dyn ServiceDataStore>,
        publisher: Arc<StatusPublisher>,
    ) -> Self {
        Self {
            last_seen: DashMap::new(),
            operations,
            datastore,
            publisher,
        }
    }

    /// Number of correlation scopes currently tracked.
    pub fn scope_count(&self) -> usize {
        self.last_seen.len()
    }

    fn slot(&self, envelope: &NotificationEnvelope) -> ScopeSlot {
        let entry = self
            .last_seen
            .entry(envelope.scope().to_string())
            .or_insert_with(|| {
                Arc::new(Scope {
                    service_name: envelope.service_name.clone(),
                    last: Mutex::new(None),
                })
            });
        Arc::clone(entry.value())
    }

    /// Drops the scopes of a removed service that no handler holds.
    fn forget_service(&self, service_name: &str) {
        let before = self.last_seen.len();
        self.last_seen
            .retain(|_, scope| scope.service_name != service_name || Arc::strong_count(scope) > 1);
        debug!(dropped = before - self.last_seen.len(), "service scopes dropped");
    }

    /// Processes one envelope.
    #[instrument(skip(self, envelope), fields(
        service = %envelope.service_name,
        correlation_id = %envelope.correlation_id,
        kind = %envelope.kind,
        status = %envelope.status,
    ))]
    pub async fn handle(&self, envelope: NotificationEnvelope) -> Transition {
        let service_name = envelope.service_name.clone();
        let slot = self.slot(&envelope);
        let transition = {
            let mut last = slot.last.lock().await;
            if last.as_ref().is_some_and(|prev| prev.same_content(&envelope)) {
                debug!(message = %envelope.status_message, "duplicate notification dropped");
                return Transition::Duplicate;
            }
            *last = Some(envelope.clone());
            self.dispatch(envelope).await
        };
        debug!(%transition, "notification processed");

        // the slot must be released before its own scope can be dropped
        drop(slot);
        if transition == Transition::ServiceDeleted {
            self.forget_service(&service_name);
        }
        transition
    }

    async fn dispatch(&self, envelope: NotificationEnvelope) -> Transition {
        if envelope.status == RpcStatus::Pending {
            info!(message = %envelope.status_message, "operation in progress");
            return Transition::Pending;
        }

        match (envelope.kind, envelope.status) {
            (NotificationKind::PathComputation, RpcStatus::Successful) => self.on_path_computed(envelope),
            (NotificationKind::PathComputation, _) => self.on_path_computation_failed(envelope),
            (NotificationKind::CancelResourceReserve, RpcStatus::Successful) => self.on_resources_released(envelope),
            (NotificationKind::ServiceImplementation, RpcStatus::Successful) => self.on_implemented(envelope),
            (NotificationKind::ServiceImplementation, _) => self.on_implementation_failed(envelope).await,
            (NotificationKind::ServiceDelete, RpcStatus::Successful) => self.on_deleted(envelope),
            (NotificationKind::CancelResourceReserve, _) | (NotificationKind::ServiceDelete, _) => {
                warn!(message = %envelope.status_message, "service removal failed");
                self.report(&envelope, self.current_state(&envelope.service_name));
                Transition::ServiceFailed
            }
        }
    }

    fn on_path_computed(&self, envelope: NotificationEnvelope) -> Transition {
        let (path_az, path_za) = match computed_paths(&envelope) {
            Some((az, za)) => (az.clone(), za.clone()),
            None => {
                error!("path computation result carries no path");
                self.set_state(&envelope.service_name, ServiceState::OutOfService);
                self.publisher.publish(
                    ServiceStatusReport::from_envelope(&envelope, Some(ServiceState::OutOfService))
                        .with_status(RpcStatus::Failed)
                        .with_message("Path computation result carries no path"),
                );
                return Transition::PathComputationFailed;
            }
        };

        let is_temporary = match self.datastore.get_service(&envelope.service_name) {
            Some(record) => record.is_temporary,
            None => {
                warn!("path computed for an unknown service");
                false
            }
        };
        if let Err(e) = self
            .datastore
            .set_paths(&envelope.service_name, path_az.clone(), path_za.clone())
        {
            warn!(error = %e, "computed paths not stored");
        }

        info!(hops = path_az.hops.len(), "path computed, implementing service");
        let request = ServiceRenderingRequest::with_paths(&envelope.correlation_id, path_az, path_za);
        // completion comes back on the renderer topic
        drop(self.operations.spawn_service_implementation(request, is_temporary));
        Transition::ImplementationStarted
    }

    fn on_path_computation_failed(&self, envelope: NotificationEnvelope) -> Transition {
        warn!(message = %envelope.status_message, "path computation failed");
        self.set_state(&envelope.service_name, ServiceState::OutOfService);
        self.report(&envelope, Some(ServiceState::OutOfService));
        Transition::PathComputationFailed
    }

    fn on_resources_released(&self, envelope: NotificationEnvelope) -> Transition {
        let paths = self
            .datastore
            .get_service(&envelope.service_name)
            .and_then(|record| record.paths().map(|(az, za)| (az.clone(), za.clone())));

        match paths {
            Some((path_az, path_za)) => {
                info!("resources released, removing service from devices");
                let request = ServiceRenderingRequest::with_paths(&envelope.correlation_id, path_az, path_za);
                drop(self.operations.spawn_service_delete(request));
                Transition::DeletionStarted
            }
            None => {
                // never implemented, nothing on the devices
                info!("service has no computed path, removing record only");
                self.remove_record(&envelope);
                Transition::ServiceDeleted
            }
        }
    }

    fn on_implemented(&self, envelope: NotificationEnvelope) -> Transition {
        self.set_state(&envelope.service_name, ServiceState::InService);
        self.audit_transition(&envelope, ServiceState::InService);
        self.report(&envelope, Some(ServiceState::InService));
        Transition::ServiceInService
    }

    async fn on_implementation_failed(&self, envelope: NotificationEnvelope) -> Transition {
        warn!(message = %envelope.status_message, "service implementation failed");
        if let Some(outcome) = self.operations.rollback_and_fail(&envelope.service_name).await {
            if !outcome.success {
                error!(
                    nodes = outcome.failed_to_rollback.len(),
                    "configuration left behind after rollback"
                );
            }
        }
        self.set_state(&envelope.service_name, ServiceState::OutOfService);
        self.audit_transition(&envelope, ServiceState::OutOfService);
        self.report(&envelope, Some(ServiceState::OutOfService));
        Transition::ServiceFailed
    }

    fn on_deleted(&self, envelope: NotificationEnvelope) -> Transition {
        self.remove_record(&envelope);
        Transition::ServiceDeleted
    }

    fn remove_record(&self, envelope: &NotificationEnvelope) {
        match self.datastore.delete_service(&envelope.service_name) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("service record already gone"),
            Err(e) => warn!(error = %e, "service record not deleted"),
        }
        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "NotificationSequencer",
            "service_deleted",
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_id(&envelope.service_name)
        .with_object_type("service")
        .with_correlation_id(&envelope.correlation_id));
        self.report(envelope, None);
    }

    fn set_state(&self, service_name: &str, state: ServiceState) {
        if let Err(e) = self.datastore.modify_service(service_name, state) {
            warn!(service = service_name, %state, error = %e, "service state not updated");
        }
    }

    fn current_state(&self, service_name: &str) -> Option<ServiceState> {
        self.datastore.get_service(service_name).map(|record| record.state)
    }

    fn report(&self, envelope: &NotificationEnvelope, state: Option<ServiceState>) {
        self.publisher
            .publish(ServiceStatusReport::from_envelope(envelope, state));
    }

    fn audit_transition(&self, envelope: &NotificationEnvelope, state: ServiceState) {
        let record = AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "NotificationSequencer",
            "service_state_changed",
        )
        .with_object_id(&envelope.service_name)
        .with_object_type("service")
        .with_correlation_id(&envelope.correlation_id)
        .with_details(serde_json::json!({ "state": state.to_string() }));
        if envelope.status == RpcStatus::Successful {
            audit_log!(record.with_outcome(AuditOutcome::Success));
        } else {
            audit_log!(record.with_error(&envelope.status_message));
        }
    }
}

/// Paths of a computed-path envelope, if it carries them.
pub fn computed_paths(envelope: &NotificationEnvelope) -> Option<(&ServicePath, &ServicePath)> {
    match &envelope.payload {
        NotificationPayload::PathComputed { az, za } => Some((az, za)),
        _ => None,
    }
}
