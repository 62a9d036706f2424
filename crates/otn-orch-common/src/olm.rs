//! Optical line management (OLM) port.
//!
//! Power leveling itself is out of scope; the orchestrator only needs to ask
//! for power setup after device rendering, power turndown before teardown,
//! and read performance counters to verify a freshly activated signal.

use async_trait::async_trait;
use otn_types::{Direction, NodeId, ServicePath};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// PM parameter that must read zero on a healthy signal.
pub const FEC_UNCORRECTABLE_BLOCKS: &str = "FECUncorrectableBlocks";

/// Errors reported by the power management layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PowerError {
    #[error("power setup failed for {service} ({direction}): {message}")]
    SetupFailed {
        service: String,
        direction: Direction,
        message: String,
    },

    #[error("power turndown failed for {service} ({direction}): {message}")]
    TurndownFailed {
        service: String,
        direction: Direction,
        message: String,
    },

    #[error("no PM data for {resource} on {node}")]
    PmUnavailable { node: NodeId, resource: String },
}

impl PowerError {
    pub fn setup_failed(request: &PowerRequest, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            service: request.service_name().to_string(),
            direction: request.direction,
            message: message.into(),
        }
    }

    pub fn turndown_failed(request: &PowerRequest, message: impl Into<String>) -> Self {
        Self::TurndownFailed {
            service: request.service_name().to_string(),
            direction: request.direction,
            message: message.into(),
        }
    }
}

/// Power setup or turndown request for one direction of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRequest {
    pub direction: Direction,
    pub path: ServicePath,
}

impl PowerRequest {
    pub fn new(path: ServicePath, direction: Direction) -> Self {
        Self { direction, path }
    }

    pub fn service_name(&self) -> &str {
        &self.path.service_name
    }
}

/// One performance monitoring counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmMeasurement {
    pub parameter: String,
    pub value: f64,
}

impl PmMeasurement {
    pub fn new(parameter: impl Into<String>, value: f64) -> Self {
        Self {
            parameter: parameter.into(),
            value,
        }
    }
}

/// Returns true if the counters show no uncorrectable FEC blocks.
///
/// A resource that does not report the counter is considered clean.
pub fn signal_is_clean(measurements: &[PmMeasurement]) -> bool {
    measurements
        .iter()
        .filter(|m| m.parameter == FEC_UNCORRECTABLE_BLOCKS)
        .all(|m| m.value == 0.0)
}

/// Power management operations consumed by the orchestrator.
#[async_trait]
pub trait PowerManagement: Send + Sync {
    /// Levels optical power along one direction of a rendered path.
    async fn power_setup(&self, request: &PowerRequest) -> Result<(), PowerError>;

    /// Turns power down along one direction before the path is torn down.
    async fn power_turndown(&self, request: &PowerRequest) -> Result<(), PowerError>;

    /// Reads current PM counters of a resource (termination point) on a node.
    async fn get_pm(&self, node: &NodeId, resource: &str) -> Result<Vec<PmMeasurement>, PowerError>;
}

/// Stand-alone power management used by the simulated daemon.
///
/// Tracks which service directions are powered and reports a clean signal
/// on every resource unless counters were overridden.
#[derive(Debug, Default)]
pub struct SimulatedPowerManagement {
    fail_setup: AtomicBool,
    powered: Mutex<HashMap<(String, Direction), usize>>,
    counters: Mutex<HashMap<(NodeId, String), Vec<PmMeasurement>>>,
}

impl SimulatedPowerManagement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent power setup fail.
    pub fn set_fail_setup(&self, fail: bool) {
        self.fail_setup.store(fail, Ordering::SeqCst);
    }

    /// Overrides the counters reported for one resource.
    pub fn set_counters(&self, node: &NodeId, resource: &str, counters: Vec<PmMeasurement>) {
        self.counters
            .lock()
            .insert((node.clone(), resource.to_string()), counters);
    }

    /// Returns true if the service direction is currently powered.
    pub fn is_powered(&self, service: &str, direction: Direction) -> bool {
        self.powered
            .lock()
            .contains_key(&(service.to_string(), direction))
    }
}

#[async_trait]
impl PowerManagement for SimulatedPowerManagement {
    async fn power_setup(&self, request: &PowerRequest) -> Result<(), PowerError> {
        if self.fail_setup.load(Ordering::SeqCst) {
            return Err(PowerError::setup_failed(request, "simulated failure"));
        }
        let hops = request.path.hops.len();
        self.powered
            .lock()
            .insert((request.service_name().to_string(), request.direction), hops);
        info!(
            service = %request.service_name(),
            direction = %request.direction,
            hops,
            "power setup complete"
        );
        Ok(())
    }

    async fn power_turndown(&self, request: &PowerRequest) -> Result<(), PowerError> {
        let removed = self
            .powered
            .lock()
            .remove(&(request.service_name().to_string(), request.direction));
        debug!(
            service = %request.service_name(),
            direction = %request.direction,
            was_powered = removed.is_some(),
            "power turndown complete"
        );
        Ok(())
    }

    async fn get_pm(&self, node: &NodeId, resource: &str) -> Result<Vec<PmMeasurement>, PowerError> {
        let counters = self
            .counters
            .lock()
            .get(&(node.clone(), resource.to_string()))
            .cloned();
        Ok(counters.unwrap_or_else(|| vec![PmMeasurement::new(FEC_UNCORRECTABLE_BLOCKS, 0.0)]))
    }
}
