//! Compensating rollback.
//!
//! A setup attempt appends one [`NodeInterfaceRecord`](crate::NodeInterfaceRecord)
//! per node to a [`RollbackHistory`]. When any step of a service
//! implementation fails, the [`RollbackProcessor`] walks its tasks in
//! reverse and undoes every step, including the ones that succeeded.

mod history;
mod processor;

pub use history::RollbackHistory;
pub use processor::{DeviceRenderingRollbackTask, PowerSetupRollbackTask, RollbackProcessor, RollbackTask};
