//! Service orchestrator.
//!
//! Drives a service through its implementation and teardown sagas:
//!
//! ```text
//! implementation:  Setup ──> PowerSetup ──> Verify ──> Done
//!                    │           │            │
//!                    └───────────┴────────────┴──> RollbackAndFail
//!
//! teardown:        PowerTurndown ──> NodeTeardown ──> Done
//! ```
//!
//! Progress and completion are published as notifications on the renderer
//! topic, where the service handler picks them up.

mod orch;
mod types;

pub use orch::RendererServiceOperations;
pub use types::{
    ImplementationStage, ServiceDeleteOutcome, ServiceImplementationOutcome,
    ServiceOperationsConfig, ServiceRenderingRequest, TeardownStage, ACTIVATION_TEST_FAILED,
    OLM_SETUP_FAILED, OPERATION_IN_PROGRESS, OPERATION_SUCCESSFUL, POWER_TURNDOWN_FAILED,
    RENDERING_FAILED,
};
