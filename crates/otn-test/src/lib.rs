//! Integration test infrastructure for the transport controller
//!
//! Provides:
//! - An in-memory device environment with transaction manager
//! - Service path fixtures for common topologies
//! - A recording power management mock with failure injection
//! - Device state verification helpers

mod device_env;
pub mod fixtures;
mod olm;
mod verification;

pub use device_env::DeviceTestEnv;
pub use fixtures::*;
pub use olm::{PowerCall, RecordingPowerManagement};
pub use verification::*;
