//! Recording power management mock

use async_trait::async_trait;
use otn_orch_common::{
    PmMeasurement, PowerError, PowerManagement, PowerRequest, FEC_UNCORRECTABLE_BLOCKS,
};
use otn_types::{Direction, NodeId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A call made to the power management port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerCall {
    Setup { service: String, direction: Direction },
    Turndown { service: String, direction: Direction },
    GetPm { node: NodeId, resource: String },
}

/// Power management mock that records every call
///
/// Setup and turndown succeed unless failure is injected; PM reads report
/// a clean signal unless [`set_bad_signal`](Self::set_bad_signal) is on.
#[derive(Debug, Default)]
pub struct RecordingPowerManagement {
    calls: Mutex<Vec<PowerCall>>,
    fail_setup: Mutex<Option<Direction>>,
    fail_turndown: AtomicBool,
    bad_signal: AtomicBool,
}

impl RecordingPowerManagement {
    /// Create a mock where everything succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail power setup for one direction
    pub fn fail_setup(&self, direction: Direction) {
        *self.fail_setup.lock() = Some(direction);
    }

    /// Fail every power turndown
    pub fn fail_turndown(&self) {
        self.fail_turndown.store(true, Ordering::SeqCst);
    }

    /// Report uncorrectable FEC blocks on every resource
    pub fn set_bad_signal(&self, bad: bool) {
        self.bad_signal.store(bad, Ordering::SeqCst);
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<PowerCall> {
        self.calls.lock().clone()
    }

    /// Number of setup calls
    pub fn setup_count(&self) -> usize {
        self.count(|c| matches!(c, PowerCall::Setup { .. }))
    }

    /// Number of turndown calls
    pub fn turndown_count(&self) -> usize {
        self.count(|c| matches!(c, PowerCall::Turndown { .. }))
    }

    /// Number of PM reads
    pub fn pm_read_count(&self) -> usize {
        self.count(|c| matches!(c, PowerCall::GetPm { .. }))
    }

    fn count(&self, predicate: impl Fn(&PowerCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl PowerManagement for RecordingPowerManagement {
    async fn power_setup(&self, request: &PowerRequest) -> Result<(), PowerError> {
        self.calls.lock().push(PowerCall::Setup {
            service: request.service_name().to_string(),
            direction: request.direction,
        });
        if *self.fail_setup.lock() == Some(request.direction) {
            return Err(PowerError::setup_failed(request, "injected failure"));
        }
        Ok(())
    }

    async fn power_turndown(&self, request: &PowerRequest) -> Result<(), PowerError> {
        self.calls.lock().push(PowerCall::Turndown {
            service: request.service_name().to_string(),
            direction: request.direction,
        });
        if self.fail_turndown.load(Ordering::SeqCst) {
            return Err(PowerError::turndown_failed(request, "injected failure"));
        }
        Ok(())
    }

    async fn get_pm(&self, node: &NodeId, resource: &str) -> Result<Vec<PmMeasurement>, PowerError> {
        self.calls.lock().push(PowerCall::GetPm {
            node: node.clone(),
            resource: resource.to_string(),
        });
        let blocks = if self.bad_signal.load(Ordering::SeqCst) {
            42.0
        } else {
            0.0
        };
        Ok(vec![PmMeasurement::new(FEC_UNCORRECTABLE_BLOCKS, blocks)])
    }
}
