//! Asynchronous result notifications.
//!
//! Path computation and the renderer report the outcome of their
//! asynchronous operations as [`NotificationEnvelope`] values. The service
//! handler consumes them at most once per correlation scope.

use crate::ServicePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation a notification reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Path computation request result.
    PathComputation,
    /// Release of the resources reserved by path computation.
    CancelResourceReserve,
    /// Device implementation (renderer) result.
    ServiceImplementation,
    /// Device teardown (renderer) result.
    ServiceDelete,
}

impl NotificationKind {
    /// Returns true for notifications produced by path computation.
    pub const fn is_path_computation(&self) -> bool {
        matches!(
            self,
            NotificationKind::PathComputation | NotificationKind::CancelResourceReserve
        )
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::PathComputation => "path-computation",
            NotificationKind::CancelResourceReserve => "cancel-resource-reserve",
            NotificationKind::ServiceImplementation => "service-implementation",
            NotificationKind::ServiceDelete => "service-delete",
        };
        write!(f, "{}", s)
    }
}

/// Status carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcStatus {
    Pending,
    Successful,
    Failed,
}

impl RpcStatus {
    /// Returns true for `Successful` and `Failed`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, RpcStatus::Successful | RpcStatus::Failed)
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcStatus::Pending => write!(f, "Pending"),
            RpcStatus::Successful => write!(f, "Successful"),
            RpcStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Data attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationPayload {
    #[default]
    None,
    /// Both directions of a computed path.
    PathComputed { az: ServicePath, za: ServicePath },
    /// Result of a device implementation.
    Implemented { is_temporary: bool },
}

/// A result notification.
///
/// Two envelopes are duplicates when kind, service name, status and status
/// message are equal; the correlation id selects the dedup scope and the
/// payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub kind: NotificationKind,
    pub service_name: String,
    pub status: RpcStatus,
    pub status_message: String,
    pub correlation_id: String,
    #[serde(default)]
    pub payload: NotificationPayload,
}

impl NotificationEnvelope {
    /// Creates an envelope without payload.
    pub fn new(
        kind: NotificationKind,
        service_name: impl Into<String>,
        status: RpcStatus,
        status_message: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            service_name: service_name.into(),
            status,
            status_message: status_message.into(),
            correlation_id: correlation_id.into(),
            payload: NotificationPayload::None,
        }
    }

    /// Attaches a payload.
    pub fn with_payload(mut self, payload: NotificationPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Key of the dedup scope this envelope belongs to.
    ///
    /// Falls back to the service name when no correlation id was supplied.
    pub fn scope(&self) -> &str {
        if self.correlation_id.is_empty() {
            &self.service_name
        } else {
            &self.correlation_id
        }
    }

    /// Structural equality used for duplicate suppression.
    pub fn same_content(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.service_name == other.service_name
            && self.status == other.status
            && self.status_message == other.status_message
    }
}
