//! Northbound entry points.

use crate::datastore::{ServiceDataStore, ServiceRecord};
use crate::error::{ServiceHandlerError, ServiceHandlerResult};
use crate::pce::PathComputation;
use crate::request::{new_correlation_id, ServiceCreateRequest};
use otn_orch_common::{audit_log, AuditCategory, AuditOutcome, AuditRecord};
use otn_renderer::RendererError;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Accepts service create and delete requests.
///
/// Both calls return once the request is recorded and handed to path
/// computation; the outcome is published later as a status report.
#[derive(Clone)]
pub struct ServiceHandler {
    datastore: Arc<dyn ServiceDataStore>,
    pce: Arc<dyn PathComputation>,
}

impl ServiceHandler {
    pub fn new(datastore: Arc<dyn ServiceDataStore>, pce: Arc<dyn PathComputation>) -> Self {
        Self { datastore, pce }
    }

    pub fn datastore(&self) -> &Arc<dyn ServiceDataStore> {
        &self.datastore
    }

    /// Records a planned service and requests its path.
    ///
    /// Returns the correlation id under which the outcome is reported.
    #[instrument(skip(self, request), fields(service = %request.service_name, correlation_id = %request.correlation_id))]
    pub async fn create_service(&self, request: ServiceCreateRequest) -> ServiceHandlerResult<String> {
        if request.service_name.trim().is_empty() {
            return Err(RendererError::invalid_request("empty service name").into());
        }
        if self.datastore.get_service(&request.service_name).is_some() {
            return Err(ServiceHandlerError::service_exists(&request.service_name));
        }

        self.datastore.create_service(ServiceRecord::planned(
            &request.service_name,
            &request.correlation_id,
            request.is_temporary,
        ))?;

        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "ServiceHandler",
            "create_service",
        )
        .with_outcome(AuditOutcome::InProgress)
        .with_object_id(&request.service_name)
        .with_object_type("service")
        .with_correlation_id(&request.correlation_id)
        .with_details(serde_json::json!({
            "channel": request.channel.to_string(),
            "hops": request.route.len(),
            "is_temporary": request.is_temporary,
        })));

        info!(hops = request.route.len(), "service accepted, requesting path");
        if let Err(e) = self.pce.request_path(&request).await {
            // nothing was computed, keep the datastore consistent
            if let Err(cleanup) = self.datastore.delete_service(&request.service_name) {
                warn!(error = %cleanup, "planned service record not removed");
            }
            return Err(e);
        }
        Ok(request.correlation_id)
    }

    /// Releases a service's resources, which triggers its removal from the
    /// devices.
    ///
    /// Returns the correlation id of the deletion.
    #[instrument(skip(self))]
    pub async fn delete_service(&self, service_name: &str) -> ServiceHandlerResult<String> {
        if self.datastore.get_service(service_name).is_none() {
            return Err(ServiceHandlerError::service_not_found(service_name));
        }

        let correlation_id = new_correlation_id();
        audit_log!(AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "ServiceHandler",
            "delete_service",
        )
        .with_outcome(AuditOutcome::InProgress)
        .with_object_id(service_name)
        .with_object_type("service")
        .with_correlation_id(&correlation_id));

        info!(%correlation_id, "service delete requested");
        self.pce
            .cancel_resource_reserve(service_name, &correlation_id)
            .await?;
        Ok(correlation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::{InMemoryServiceStore, ServiceRecord, ServiceState};
    use crate::pce::ExplicitRoutePce;
    use otn_types::{Channel, NotificationKind, PathHop, RpcStatus, ServicePath};
    use tokio::sync::mpsc;

    fn handler() -> (
        ServiceHandler,
        Arc<InMemoryServiceStore>,
        mpsc::Receiver<otn_types::NotificationEnvelope>,
    ) {
        let (tx, rx) = mpsc::channel(8);
        let store = Arc::new(InMemoryServiceStore::new());
        let handler = ServiceHandler::new(store.clone(), Arc::new(ExplicitRoutePce::new(tx)));
        (handler, store, rx)
    }

    fn request() -> ServiceCreateRequest {
        ServiceCreateRequest::new(
            "service1",
            Channel::Wavelength(1),
            vec![PathHop::new("node1", "SRG1-PP1-TXRX", "DEG1-TTP-TXRX")],
        )
        .with_correlation_id("req-1")
    }

    #[tokio::test]
    async fn test_create_records_planned_service() {
        let (handler, store, mut rx) = handler();

        let correlation_id = handler.create_service(request()).await.unwrap();
        assert_eq!(correlation_id, "req-1");
        assert_eq!(
            store.get_service("service1").unwrap().state,
            ServiceState::Planned
        );

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.kind, NotificationKind::PathComputation);
        assert_eq!(envelope.status, RpcStatus::Successful);
    }

    #[tokio::test]
    async fn test_create_rejects_existing_name() {
        let (handler, _store, _rx) = handler();
        handler.create_service(request()).await.unwrap();

        let err = handler.create_service(request()).await.unwrap_err();
        assert!(matches!(err, ServiceHandlerError::ServiceExists { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let (handler, store, _rx) = handler();
        let mut request = request();
        request.service_name = " ".to_string();

        let err = handler.create_service(request).await.unwrap_err();
        assert!(matches!(err, ServiceHandlerError::Renderer(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_closed_topic_undoes_create() {
        let (handler, store, rx) = handler();
        drop(rx);

        let err = handler.create_service(request()).await.unwrap_err();
        assert!(matches!(err, ServiceHandlerError::ChannelClosed { .. }));
        assert!(store.get_service("service1").is_none());
    }

    /// Store whose deletes always fail.
    struct UndeletableStore(InMemoryServiceStore);

    impl ServiceDataStore for UndeletableStore {
        fn create_service(&self, record: ServiceRecord) -> ServiceHandlerResult<()> {
            self.0.create_service(record)
        }

        fn modify_service(&self, name: &str, state: ServiceState) -> ServiceHandlerResult<()> {
            self.0.modify_service(name, state)
        }

        fn delete_service(&self, _name: &str) -> ServiceHandlerResult<()> {
            Err(ServiceHandlerError::datastore("delete", "record locked"))
        }

        fn get_service(&self, name: &str) -> Option<ServiceRecord> {
            self.0.get_service(name)
        }

        fn set_paths(&self, name: &str, path_az: ServicePath, path_za: ServicePath) -> ServiceHandlerResult<()> {
            self.0.set_paths(name, path_az, path_za)
        }
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_publish_error() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let store = Arc::new(UndeletableStore(InMemoryServiceStore::new()));
        let handler = ServiceHandler::new(store.clone(), Arc::new(ExplicitRoutePce::new(tx)));

        let err = handler.create_service(request()).await.unwrap_err();
        assert!(matches!(err, ServiceHandlerError::ChannelClosed { .. }));
        // the record could not be removed and is left planned
        assert_eq!(
            store.get_service("service1").unwrap().state,
            ServiceState::Planned
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_service() {
        let (handler, _store, _rx) = handler();
        let err = handler.delete_service("service1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_uses_new_correlation_scope() {
        let (handler, _store, mut rx) = handler();
        handler.create_service(request()).await.unwrap();
        rx.recv().await.unwrap();

        let correlation_id = handler.delete_service("service1").await.unwrap();
        assert_ne!(correlation_id, "req-1");

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.kind, NotificationKind::CancelResourceReserve);
        assert_eq!(envelope.correlation_id, correlation_id);
    }
}
