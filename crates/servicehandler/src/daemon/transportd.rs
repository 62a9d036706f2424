//! TransportDaemon implementation.
//!
//! The daemon wires the collaborators together and runs one consumer task
//! per notification topic:
//!
//! ```text
//!  ServiceHandler ──> PathComputation ──> [path-computation topic] ──┐
//!                                                                    ▼
//!                                                        NotificationSequencer ──> StatusPublisher
//!                                                                    ▲      │
//!  RendererServiceOperations ──────────> [renderer topic] ───────────┘      │
//!            ▲                                                              │
//!            └────────────────── spawn implementation / delete ─────────────┘
//! ```

use crate::config::TransportConfig;
use crate::datastore::ServiceDataStore;
use crate::error::{ServiceHandlerError, ServiceHandlerResult};
use crate::handler::ServiceHandler;
use crate::pce::{ExplicitRoutePce, PCE_TOPIC};
use crate::publisher::{ServiceStatusReport, StatusPublisher};
use crate::sequencer::NotificationSequencer;
use otn_orch_common::{
    audit_log, AuditCategory, AuditOutcome, AuditRecord, DeviceAccess, DeviceTransactionManager,
    PowerManagement,
};
use otn_renderer::{DeviceRenderer, RendererServiceOperations};
use otn_types::NotificationEnvelope;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Topic name of renderer notifications.
pub const RENDERER_TOPIC: &str = "renderer";

/// The transport service daemon.
pub struct TransportDaemon {
    handler: ServiceHandler,
    operations: RendererServiceOperations,
    sequencer: Arc<NotificationSequencer>,
    publisher: Arc<StatusPublisher>,
    pce_rx: Option<mpsc::Receiver<NotificationEnvelope>>,
    renderer_rx: Option<mpsc::Receiver<NotificationEnvelope>>,
    shutdown: CancellationToken,
    tasks: JoinSet<()>,
}

impl TransportDaemon {
    /// Builds the daemon over the given collaborators.
    pub fn new(
        config: &TransportConfig,
        device: Arc<dyn DeviceAccess>,
        olm: Arc<dyn PowerManagement>,
        datastore: Arc<dyn ServiceDataStore>,
    ) -> Self {
        let capacity = config.channels.capacity;
        let (pce_tx, pce_rx) = mpsc::channel(capacity);
        let (renderer_tx, renderer_rx) = mpsc::channel(capacity);

        let transactions = Arc::new(DeviceTransactionManager::new(device, config.device_timeout()));
        let renderer = DeviceRenderer::new(transactions, config.renderer_config());
        let operations =
            RendererServiceOperations::new(renderer, olm, renderer_tx, config.operations_config());

        let publisher = Arc::new(StatusPublisher::new(capacity));
        let sequencer = Arc::new(NotificationSequencer::new(
            operations.clone(),
            Arc::clone(&datastore),
            Arc::clone(&publisher),
        ));
        let handler = ServiceHandler::new(datastore, Arc::new(ExplicitRoutePce::new(pce_tx)));

        Self {
            handler,
            operations,
            sequencer,
            publisher,
            pce_rx: Some(pce_rx),
            renderer_rx: Some(renderer_rx),
            shutdown: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Northbound entry points.
    pub fn handler(&self) -> &ServiceHandler {
        &self.handler
    }

    pub fn operations(&self) -> &RendererServiceOperations {
        &self.operations
    }

    pub fn sequencer(&self) -> &Arc<NotificationSequencer> {
        &self.sequencer
    }

    /// Subscribes to service status reports.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceStatusReport> {
        self.publisher.subscribe()
    }

    pub fn publisher(&self) -> &Arc<StatusPublisher> {
        &self.publisher
    }

    /// Token cancelled when the daemon stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Starts the topic consumers. Fails if already started.
    pub fn start(&mut self) -> ServiceHandlerResult<()> {
        let pce_rx = self
            .pce_rx
            .take()
            .ok_or_else(|| ServiceHandlerError::channel_closed(PCE_TOPIC))?;
        let renderer_rx = self
            .renderer_rx
            .take()
            .ok_or_else(|| ServiceHandlerError::channel_closed(RENDERER_TOPIC))?;

        for (topic, rx) in [(PCE_TOPIC, pce_rx), (RENDERER_TOPIC, renderer_rx)] {
            self.tasks.spawn(consume(
                topic,
                rx,
                Arc::clone(&self.sequencer),
                self.shutdown.clone(),
            ));
        }

        info!("transport daemon started");
        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            "TransportDaemon",
            "daemon_started",
        )
        .with_outcome(AuditOutcome::Success)
        .with_details(serde_json::json!({
            "topics": [PCE_TOPIC, RENDERER_TOPIC],
        })));
        Ok(())
    }

    /// Asks the consumers to stop.
    pub fn stop(&self) {
        info!("stopping transport daemon");
        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            "TransportDaemon",
            "stop_requested",
        )
        .with_outcome(AuditOutcome::Success));
        self.shutdown.cancel();
    }

    /// Waits for the consumers to finish.
    pub async fn join(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "topic consumer aborted");
            }
        }
        info!(
            implemented = self.operations.implemented_count(),
            "transport daemon stopped"
        );
        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            "TransportDaemon",
            "daemon_stopped",
        )
        .with_outcome(AuditOutcome::Success));
    }
}

async fn consume(
    topic: &'static str,
    mut rx: mpsc::Receiver<NotificationEnvelope>,
    sequencer: Arc<NotificationSequencer>,
    shutdown: CancellationToken,
) {
    debug!(topic, "consumer started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = rx.recv() => match next {
                Some(envelope) => {
                    let transition = sequencer.handle(envelope).await;
                    debug!(topic, %transition, "envelope consumed");
                }
                None => {
                    warn!(topic, "topic closed");
                    break;
                }
            },
        }
    }
    debug!(topic, "consumer stopped");
}
