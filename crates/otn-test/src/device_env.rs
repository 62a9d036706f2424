//! In-memory device environment for tests

use otn_orch_common::{DeviceTransactionManager, InMemoryDevice};
use otn_types::NodeId;
use std::sync::Arc;
use std::time::Duration;

/// Default per-call budget used by test environments
const TEST_DEVICE_TIMEOUT: Duration = Duration::from_millis(500);

/// A simulated network with its transaction manager
pub struct DeviceTestEnv {
    device: Arc<InMemoryDevice>,
    transactions: Arc<DeviceTransactionManager>,
}

impl DeviceTestEnv {
    /// Mounts the given nodes
    pub fn with_nodes<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self::with_timeout(nodes, TEST_DEVICE_TIMEOUT)
    }

    /// Mounts the given nodes with a custom device call budget
    pub fn with_timeout<I, N>(nodes: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        let device = Arc::new(InMemoryDevice::with_nodes(nodes));
        let backend: Arc<InMemoryDevice> = Arc::clone(&device);
        let transactions = Arc::new(DeviceTransactionManager::new(backend, timeout));
        Self {
            device,
            transactions,
        }
    }

    /// The simulated device backend
    pub fn device(&self) -> &Arc<InMemoryDevice> {
        &self.device
    }

    /// Transaction manager over the simulated backend
    pub fn transactions(&self) -> Arc<DeviceTransactionManager> {
        Arc::clone(&self.transactions)
    }
}
