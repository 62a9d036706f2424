//! Device renderer and service orchestrator.
//!
//! Turns a computed service path into device configuration on every node it
//! crosses, and removes that configuration again when a later step fails or
//! the service is deleted.
//!
//! # Architecture
//!
//! ```text
//! RendererServiceOperations ──> DeviceRenderer ──┬──> InterfaceProvisioner ──┐
//!          │                          │          └──> CrossConnectManager ───┤
//!          │                          │                                      ▼
//!          │                    RollbackHistory                  DeviceTransactionManager
//!          │                                                                 │
//!          └──> PowerManagement (OLM)                                   DeviceAccess
//! ```
//!
//! # Key Components
//!
//! - [`DeviceRenderer`]: per-node setup, teardown and rollback of one path
//! - [`RollbackProcessor`]: reverse-order compensation of a service attempt
//! - [`RendererServiceOperations`]: implementation and teardown sagas

pub mod crossconnect;
pub mod device_renderer;
pub mod error;
pub mod interfaces;
pub mod operations;
pub mod rollback;
pub mod types;

pub use crossconnect::{connection_name, CrossConnectManager};
pub use device_renderer::{DeviceRenderer, DeviceRendererConfig, DEFAULT_MAX_PARALLEL_NODES};
pub use error::{InterfaceError, RendererError};
pub use interfaces::{InterfaceParams, InterfaceProvisioner};
pub use operations::{
    ImplementationStage, RendererServiceOperations, ServiceDeleteOutcome,
    ServiceImplementationOutcome, ServiceOperationsConfig, ServiceRenderingRequest, TeardownStage,
};
pub use rollback::{
    DeviceRenderingRollbackTask, PowerSetupRollbackTask, RollbackHistory, RollbackProcessor,
    RollbackTask,
};
pub use types::{
    CreatedInterface, FailedToRollback, NodeInterfaceRecord, RollbackOutcome, ServicePathOutcome,
    CONNECTIONS_CREATED_PREFIX, REQUEST_PROCESSED,
};
