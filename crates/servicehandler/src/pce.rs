//! Path computation port.
//!
//! Path computation answers asynchronously: results are delivered as
//! [`NotificationEnvelope`]s on the path-computation topic, never as return
//! values.

use crate::error::{ServiceHandlerError, ServiceHandlerResult};
use crate::request::ServiceCreateRequest;
use async_trait::async_trait;
use otn_types::{NotificationEnvelope, NotificationKind, NotificationPayload, RpcStatus};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

/// Status message of a computed path.
pub const PATH_CALCULATED: &str = "Path is calculated";

/// Status message of a released reservation.
pub const RESOURCES_RELEASED: &str = "Resources released";

/// Topic name used in channel errors.
pub const PCE_TOPIC: &str = "path-computation";

/// Path computation engine.
#[async_trait]
pub trait PathComputation: Send + Sync {
    /// Requests a path for a new service.
    async fn request_path(&self, request: &ServiceCreateRequest) -> ServiceHandlerResult<()>;

    /// Releases the resources reserved for a service.
    async fn cancel_resource_reserve(&self, service_name: &str, correlation_id: &str) -> ServiceHandlerResult<()>;
}

/// Path computation that accepts the explicit route carried by the request.
///
/// The route is checked for well-formedness only; the Z-A direction is the
/// reverse of the route.
#[derive(Debug, Clone)]
pub struct ExplicitRoutePce {
    notifications: mpsc::Sender<NotificationEnvelope>,
}

impl ExplicitRoutePce {
    pub fn new(notifications: mpsc::Sender<NotificationEnvelope>) -> Self {
        Self { notifications }
    }

    async fn send(&self, envelope: NotificationEnvelope) -> ServiceHandlerResult<()> {
        self.notifications
            .send(envelope)
            .await
            .map_err(|_| ServiceHandlerError::channel_closed(PCE_TOPIC))
    }
}

#[async_trait]
impl PathComputation for ExplicitRoutePce {
    #[instrument(skip(self, request), fields(service = %request.service_name, correlation_id = %request.correlation_id))]
    async fn request_path(&self, request: &ServiceCreateRequest) -> ServiceHandlerResult<()> {
        let path_az = request.path();

        let envelope = if request.route.is_empty() {
            warn!("empty route");
            NotificationEnvelope::new(
                NotificationKind::PathComputation,
                &request.service_name,
                RpcStatus::Failed,
                "No path available: empty route",
                &request.correlation_id,
            )
        } else if let Err(e) = path_az.validate() {
            warn!(error = %e, "route rejected");
            NotificationEnvelope::new(
                NotificationKind::PathComputation,
                &request.service_name,
                RpcStatus::Failed,
                format!("No path available: {}", e),
                &request.correlation_id,
            )
        } else {
            info!(hops = request.route.len(), "path computed");
            let path_za = path_az.reversed();
            NotificationEnvelope::new(
                NotificationKind::PathComputation,
                &request.service_name,
                RpcStatus::Successful,
                PATH_CALCULATED,
                &request.correlation_id,
            )
            .with_payload(NotificationPayload::PathComputed {
                az: path_az,
                za: path_za,
            })
        };

        self.send(envelope).await
    }

    #[instrument(skip(self))]
    async fn cancel_resource_reserve(&self, service_name: &str, correlation_id: &str) -> ServiceHandlerResult<()> {
        info!("releasing reserved resources");
        self.send(NotificationEnvelope::new(
            NotificationKind::CancelResourceReserve,
            service_name,
            RpcStatus::Successful,
            RESOURCES_RELEASED,
            correlation_id,
        ))
        .await
    }
}
