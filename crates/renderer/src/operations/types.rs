//! Service orchestrator requests, outcomes and status messages.

use otn_types::ServicePath;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Status message of a fully completed implementation or deletion.
pub const OPERATION_SUCCESSFUL: &str = "Operation Successful";

/// Status message while an operation is in progress.
pub const OPERATION_IN_PROGRESS: &str = "Operation in progress";

pub const RENDERING_FAILED: &str =
    "Device rendering was not successful! Rendering will be rolled back.";

pub const OLM_SETUP_FAILED: &str =
    "OLM power setup was not successful! Rendering and OLM will be rolled back.";

pub const ACTIVATION_TEST_FAILED: &str = "Service activation test failed.";

pub const POWER_TURNDOWN_FAILED: &str = "Service power turndown failed";

/// Both directions of a service to render or tear down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRenderingRequest {
    pub service_name: String,
    pub correlation_id: String,
    pub path_az: ServicePath,
    pub path_za: ServicePath,
}

impl ServiceRenderingRequest {
    /// Creates a request whose Z-A path is the reverse of `path_az`.
    pub fn new(correlation_id: impl Into<String>, path_az: ServicePath) -> Self {
        Self {
            service_name: path_az.service_name.clone(),
            correlation_id: correlation_id.into(),
            path_za: path_az.reversed(),
            path_az,
        }
    }

    /// Creates a request with explicitly computed paths for both directions.
    pub fn with_paths(correlation_id: impl Into<String>, path_az: ServicePath, path_za: ServicePath) -> Self {
        Self {
            service_name: path_az.service_name.clone(),
            correlation_id: correlation_id.into(),
            path_az,
            path_za,
        }
    }
}

/// Stages of a service implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImplementationStage {
    Setup,
    PowerSetup,
    Verify,
    Done,
    RollbackAndFail,
}

impl fmt::Display for ImplementationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImplementationStage::Setup => "setup",
            ImplementationStage::PowerSetup => "power-setup",
            ImplementationStage::Verify => "verify",
            ImplementationStage::Done => "done",
            ImplementationStage::RollbackAndFail => "rollback-and-fail",
        };
        write!(f, "{}", s)
    }
}

/// Stages of a service teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeardownStage {
    PowerTurndown,
    NodeTeardown,
    Done,
}

impl fmt::Display for TeardownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TeardownStage::PowerTurndown => "power-turndown",
            TeardownStage::NodeTeardown => "node-teardown",
            TeardownStage::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// Result of a service implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceImplementationOutcome {
    pub service_name: String,
    pub success: bool,
    pub message: String,
    /// `Done` on success, otherwise the stage that failed
    pub stage: ImplementationStage,
}

/// Result of a service teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeleteOutcome {
    pub service_name: String,
    pub success: bool,
    pub message: String,
    /// `Done` on success, otherwise the stage that failed
    pub stage: TeardownStage,
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct ServiceOperationsConfig {
    /// Poll PM counters after power setup
    pub verify_signal: bool,
    /// PM reads per end before giving up
    pub pm_attempts: u32,
    /// Delay between PM reads
    pub pm_interval: Duration,
}

impl Default for ServiceOperationsConfig {
    fn default() -> Self {
        Self {
            verify_signal: false,
            pm_attempts: 3,
            pm_interval: Duration::from_millis(1000),
        }
    }
}
