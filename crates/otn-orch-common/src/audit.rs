//! Audit logging for device configuration changes.
//!
//! Every change pushed to a network element (interface, cross-connect),
//! every compensation performed by a rollback and every service lifecycle
//! transition is recorded as an [`AuditRecord`] and emitted on the `audit`
//! tracing target through [`audit_log!`](crate::audit_log).
//!
//! Records are serialized as JSON so they can be shipped to a log collector
//! unchanged:
//!
//! ```text
//! {"timestamp":"...","category":"RESOURCE_CREATE","source":"InterfaceProvisioner",
//!  "action":"create_interface","outcome":"success","object_id":"SRG1-PP1-TXRX-1",
//!  "object_type":"optical-channel","details":{"node":"ROADM-A1"}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Device resource creation (interface, cross-connect)
    ResourceCreate,
    /// Device resource deletion
    ResourceDelete,
    /// Compensation of a failed provisioning attempt
    Rollback,
    /// Optical power setup / turndown
    PowerControl,
    /// Service state transitions driven by notifications
    ServiceLifecycle,
    /// Daemon startup and shutdown
    SystemLifecycle,
    /// Error and failure events
    ErrorCondition,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditCategory::ResourceCreate => write!(f, "RESOURCE_CREATE"),
            AuditCategory::ResourceDelete => write!(f, "RESOURCE_DELETE"),
            AuditCategory::Rollback => write!(f, "ROLLBACK"),
            AuditCategory::PowerControl => write!(f, "POWER_CONTROL"),
            AuditCategory::ServiceLifecycle => write!(f, "SERVICE_LIFECYCLE"),
            AuditCategory::SystemLifecycle => write!(f, "SYSTEM_LIFECYCLE"),
            AuditCategory::ErrorCondition => write!(f, "ERROR_CONDITION"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Action completed successfully
    Success,
    /// Action failed
    Failure,
    /// Action is in progress
    InProgress,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Failure => write!(f, "failure"),
            AuditOutcome::InProgress => write!(f, "in_progress"),
        }
    }
}

/// Structured audit record.
///
/// Built once with the `with_*` helpers and never mutated after it has been
/// logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// UTC timestamp of record creation
    pub timestamp: DateTime<Utc>,

    /// Event category
    pub category: AuditCategory,

    /// Component generating the event
    pub source: String,

    /// Operation performed
    pub action: String,

    /// Outcome of the operation
    pub outcome: AuditOutcome,

    /// Affected object (interface name, connection name, service name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// Affected object type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    /// Additional context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Error message if outcome is failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Correlation ID of the service request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl AuditRecord {
    /// Create a new audit record with the current timestamp.
    ///
    /// The outcome defaults to `InProgress` until explicitly set.
    pub fn new(
        category: AuditCategory,
        source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::InProgress,
            object_id: None,
            object_type: None,
            details: None,
            error: None,
            correlation_id: None,
        }
    }

    /// Set the outcome of the action.
    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Set the object identifier affected by the action.
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Set the object type for classification.
    pub fn with_object_type(mut self, obj_type: impl Into<String>) -> Self {
        self.object_type = Some(obj_type.into());
        self
    }

    /// Add additional context details as JSON.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Set the error message and mark outcome as Failure.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    /// Set the correlation ID of the request this event belongs to.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Convert to a JSON string for logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Emits an [`AuditRecord`] on the `audit` target.
///
/// Successful records are logged at info, in-progress records at debug and
/// failures at warn.
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        let record = $record;
        match record.outcome {
            $crate::audit::AuditOutcome::Success => {
                tracing::info!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::InProgress => {
                tracing::debug!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::Failure => {
                tracing::warn!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    error = record.error.as_deref().unwrap_or(""),
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
        }
    };
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `log_level`. With `json` set, events are
/// written as one JSON object per line.
pub fn init_logging(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_record_creation() {
        let record = AuditRecord::new(
            AuditCategory::ResourceCreate,
            "CrossConnectManager",
            "create_cross_connect",
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_id("SRG1-PP1-TXRX-1-x-DEG1-TTP-TXRX-1")
        .with_object_type("roadm-connection");

        assert_eq!(record.category, AuditCategory::ResourceCreate);
        assert_eq!(record.outcome, AuditOutcome::Success);
        assert_eq!(record.source, "CrossConnectManager");
        assert!(record.error.is_none());
    }

    #[test]
    fn test_with_error_marks_failure() {
        let record = AuditRecord::new(AuditCategory::Rollback, "DeviceRenderer", "renderer_rollback")
            .with_outcome(AuditOutcome::Success)
            .with_error("interface still in use");
        assert_eq!(record.outcome, AuditOutcome::Failure);
        assert_eq!(record.error.as_deref(), Some("interface still in use"));
    }

    #[test]
    fn test_to_json_skips_empty_fields() {
        let record = AuditRecord::new(
            AuditCategory::ServiceLifecycle,
            "NotificationSequencer",
            "commit_service",
        )
        .with_correlation_id("req-42")
        .with_details(serde_json::json!({"state": "inService"}));

        let json = record.to_json();
        assert!(json.contains("\"category\":\"SERVICE_LIFECYCLE\""));
        assert!(json.contains("\"correlation_id\":\"req-42\""));
        assert!(!json.contains("object_id"));
    }

    #[test]
    fn test_audit_log_macro_compiles_for_all_outcomes() {
        for outcome in [
            AuditOutcome::Success,
            AuditOutcome::InProgress,
            AuditOutcome::Failure,
        ] {
            audit_log!(AuditRecord::new(AuditCategory::SystemLifecycle, "test", "noop")
                .with_outcome(outcome));
        }
    }
}
