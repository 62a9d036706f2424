//! Rollback processor and compensation tasks.

use super::RollbackHistory;
use crate::device_renderer::DeviceRenderer;
use crate::error::RendererError;
use crate::types::RollbackOutcome;
use async_trait::async_trait;
use otn_orch_common::{audit_log, AuditCategory, AuditOutcome, AuditRecord, PowerManagement, PowerRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// One compensable step of a service implementation.
#[async_trait]
pub trait RollbackTask: Send {
    /// Task identifier used in logs.
    fn id(&self) -> &str;

    /// Returns true if the step this task guards has failed.
    fn is_rollback_necessary(&self) -> bool;

    /// Undoes the step.
    async fn rollback(&mut self) -> Result<(), RendererError>;
}

/// Runs compensation tasks in reverse registration order.
#[derive(Default)]
pub struct RollbackProcessor {
    tasks: Vec<Box<dyn RollbackTask>>,
}

impl RollbackProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, task: impl RollbackTask + 'static) {
        self.tasks.push(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns true if any registered task reports a failed step.
    pub fn is_rollback_necessary(&self) -> bool {
        self.tasks.iter().any(|t| t.is_rollback_necessary())
    }

    /// Compensates every task if at least one of them failed.
    ///
    /// Returns the number of tasks rolled back (zero when nothing failed).
    pub async fn rollback_all_if_necessary(&mut self) -> usize {
        if !self.is_rollback_necessary() {
            return 0;
        }
        self.rollback_all().await
    }

    /// Compensates every task, last registered first.
    pub async fn rollback_all(&mut self) -> usize {
        let mut rolled_back = 0;
        for task in self.tasks.iter_mut().rev() {
            info!(task = task.id(), "rolling back");
            match task.rollback().await {
                Ok(()) => {
                    audit_log!(AuditRecord::new(AuditCategory::Rollback, "RollbackProcessor", "rollback_task")
                        .with_outcome(AuditOutcome::Success)
                        .with_object_id(task.id()));
                }
                Err(e) => {
                    warn!(task = task.id(), error = %e, "rollback task failed");
                    audit_log!(AuditRecord::new(AuditCategory::Rollback, "RollbackProcessor", "rollback_task")
                        .with_object_id(task.id())
                        .with_error(e.to_string()));
                }
            }
            rolled_back += 1;
        }
        rolled_back
    }
}

/// Compensates the device configuration created for one direction.
pub struct DeviceRenderingRollbackTask {
    id: String,
    necessary: bool,
    history: Option<RollbackHistory>,
    renderer: DeviceRenderer,
    outcome: Option<RollbackOutcome>,
}

impl DeviceRenderingRollbackTask {
    pub fn new(id: impl Into<String>, necessary: bool, history: RollbackHistory, renderer: DeviceRenderer) -> Self {
        Self {
            id: id.into(),
            necessary,
            history: Some(history),
            renderer,
            outcome: None,
        }
    }

    /// Outcome of the rollback, once it has run.
    pub fn outcome(&self) -> Option<&RollbackOutcome> {
        self.outcome.as_ref()
    }
}

#[async_trait]
impl RollbackTask for DeviceRenderingRollbackTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_rollback_necessary(&self) -> bool {
        self.necessary
    }

    async fn rollback(&mut self) -> Result<(), RendererError> {
        let Some(history) = self.history.take() else {
            return Ok(());
        };
        let outcome = self.renderer.renderer_rollback(history).await;
        self.outcome = Some(outcome.clone());
        outcome.into_result()
    }
}

/// Turns power back down for one direction.
pub struct PowerSetupRollbackTask {
    id: String,
    necessary: bool,
    request: PowerRequest,
    olm: Arc<dyn PowerManagement>,
}

impl PowerSetupRollbackTask {
    pub fn new(id: impl Into<String>, necessary: bool, request: PowerRequest, olm: Arc<dyn PowerManagement>) -> Self {
        Self {
            id: id.into(),
            necessary,
            request,
            olm,
        }
    }
}

#[async_trait]
impl RollbackTask for PowerSetupRollbackTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_rollback_necessary(&self) -> bool {
        self.necessary
    }

    async fn rollback(&mut self) -> Result<(), RendererError> {
        self.olm.power_turndown(&self.request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingTask {
        id: String,
        necessary: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RollbackTask for RecordingTask {
        fn id(&self) -> &str {
            &self.id
        }

        fn is_rollback_necessary(&self) -> bool {
            self.necessary
        }

        async fn rollback(&mut self) -> Result<(), RendererError> {
            self.log.lock().push(self.id.clone());
            Ok(())
        }
    }

    fn processor(necessary: [bool; 3], log: &Arc<Mutex<Vec<String>>>) -> RollbackProcessor {
        let mut processor = RollbackProcessor::new();
        for (i, necessary) in necessary.into_iter().enumerate() {
            processor.add_task(RecordingTask {
                id: format!("task{}", i),
                necessary,
                log: Arc::clone(log),
            });
        }
        processor
    }

    #[tokio::test]
    async fn test_nothing_rolled_back_without_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut processor = processor([false, false, false], &log);
        assert_eq!(processor.rollback_all_if_necessary().await, 0);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_all_tasks_rolled_back_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut processor = processor([false, true, false], &log);
        assert_eq!(processor.len(), 3);
        assert_eq!(processor.rollback_all_if_necessary().await, 3);
        assert_eq!(*log.lock(), vec!["task2", "task1", "task0"]);
    }
}
