//! Northbound service status reports.

use crate::datastore::ServiceState;
use chrono::{DateTime, Utc};
use otn_types::{NotificationEnvelope, NotificationKind, RpcStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Outcome of a service operation as reported northbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatusReport {
    pub service_name: String,
    pub correlation_id: String,
    /// Operation the report is about
    pub kind: NotificationKind,
    pub status: RpcStatus,
    pub message: String,
    /// Service state after the operation; `None` once the service is gone
    pub state: Option<ServiceState>,
    pub timestamp: DateTime<Utc>,
}

impl ServiceStatusReport {
    /// Builds a report from the notification that caused it.
    pub fn from_envelope(envelope: &NotificationEnvelope, state: Option<ServiceState>) -> Self {
        Self {
            service_name: envelope.service_name.clone(),
            correlation_id: envelope.correlation_id.clone(),
            kind: envelope.kind,
            status: envelope.status,
            message: envelope.status_message.clone(),
            state,
            timestamp: Utc::now(),
        }
    }

    /// Overrides the status.
    pub fn with_status(mut self, status: RpcStatus) -> Self {
        self.status = status;
        self
    }

    /// Overrides the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == RpcStatus::Successful
    }
}

/// Fans status reports out to every subscriber.
///
/// Publishing never blocks; with no subscriber the report is only logged.
#[derive(Debug)]
pub struct StatusPublisher {
    tx: broadcast::Sender<ServiceStatusReport>,
    published: AtomicUsize,
}

impl StatusPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            published: AtomicUsize::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceStatusReport> {
        self.tx.subscribe()
    }

    pub fn publish(&self, report: ServiceStatusReport) {
        self.published.fetch_add(1, Ordering::SeqCst);
        info!(
            service = %report.service_name,
            correlation_id = %report.correlation_id,
            kind = %report.kind,
            status = %report.status,
            message = %report.message,
            "service status published"
        );
        if self.tx.send(report).is_err() {
            debug!("no status subscribers");
        }
    }

    /// Number of reports published so far.
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }
}
