//! Common orchestration building blocks for the transport controller.
//!
//! This crate holds the ports the provisioning core talks through and the
//! plumbing shared by every component:
//!
//! - [`DeviceAccess`]: transactional access to mounted network elements
//! - [`DeviceTransactionManager`]: one in-flight transaction per node, with
//!   a time budget on every device call
//! - [`PowerManagement`]: optical power setup, turndown and PM reads
//! - [`InMemoryDevice`] / [`SimulatedPowerManagement`]: in-process backends
//!   for simulation and tests
//! - [`audit`]: structured audit records emitted on the `audit` target
//!
//! # Example
//!
//! ```
//! use otn_orch_common::{DevicePath, DeviceTransactionManager, InMemoryDevice};
//! use otn_types::NodeId;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test_block(async {
//! let device = Arc::new(InMemoryDevice::with_nodes(["ROADM-A1"]));
//! let manager = DeviceTransactionManager::new(device.clone(), Duration::from_secs(1));
//!
//! let node = NodeId::from("ROADM-A1");
//! let tx = manager.begin(&node).await.unwrap();
//! tx.put(&DevicePath::interface("SRG1-PP1-TXRX-1"), serde_json::json!({})).await.unwrap();
//! tx.commit().await.unwrap();
//!
//! assert!(device.contains(&node, &DevicePath::interface("SRG1-PP1-TXRX-1")));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod audit;
mod device;
mod memory;
mod olm;
mod transaction;

pub use audit::{init_logging, AuditCategory, AuditOutcome, AuditRecord};
pub use device::{DeviceAccess, DeviceError, DevicePath, DeviceResult};
pub use memory::{DeviceCall, DeviceOperation, Fault, InMemoryDevice};
pub use olm::{
    signal_is_clean, PmMeasurement, PowerError, PowerManagement, PowerRequest,
    SimulatedPowerManagement, FEC_UNCORRECTABLE_BLOCKS,
};
pub use transaction::{DeviceTransaction, DeviceTransactionManager, DEFAULT_DEVICE_TIMEOUT};
