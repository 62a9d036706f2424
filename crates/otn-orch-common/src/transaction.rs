//! Per-node transaction serialization and call budgets.

use crate::device::{DeviceAccess, DeviceError, DevicePath, DeviceResult};
use dashmap::DashMap;
use otn_types::NodeId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Default budget for a single device call.
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Hands out device transactions, one in flight per node.
///
/// Distinct nodes are independent configuration targets and may be worked
/// on concurrently; a second transaction on the same node waits until the
/// first one is committed or dropped. Every individual device call is
/// bounded by the configured timeout.
pub struct DeviceTransactionManager {
    device: Arc<dyn DeviceAccess>,
    node_locks: DashMap<NodeId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl DeviceTransactionManager {
    /// Creates a manager over the given device port.
    pub fn new(device: Arc<dyn DeviceAccess>, timeout: Duration) -> Self {
        Self {
            device,
            node_locks: DashMap::new(),
            timeout,
        }
    }

    /// Returns the per-call time budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn node_lock(&self, node: &NodeId) -> Arc<Mutex<()>> {
        Arc::clone(self.node_locks.entry(node.clone()).or_default().value())
    }

    /// Opens a transaction on `node`, waiting for any transaction already in
    /// flight on that node.
    pub async fn begin(&self, node: &NodeId) -> DeviceResult<DeviceTransaction> {
        let guard = self.node_lock(node).lock_owned().await;
        debug!(node = %node, "device transaction opened");

        bounded(node, "open", self.timeout, self.device.open(node)).await?;

        Ok(DeviceTransaction {
            node: node.clone(),
            device: Arc::clone(&self.device),
            timeout: self.timeout,
            _guard: guard,
        })
    }

    /// Returns false only if the device reports the node as not mounted.
    ///
    /// Other failures (timeouts, rejected opens) surface on the calls that
    /// follow.
    pub async fn is_mounted(&self, node: &NodeId) -> bool {
        match self.begin(node).await {
            Ok(tx) => {
                tx.cancel().await;
                true
            }
            Err(e) if e.is_not_mounted() => {
                debug!(node = %node, "node not mounted");
                false
            }
            Err(e) => {
                debug!(node = %node, error = %e, "node mounted but open failed");
                true
            }
        }
    }
}

/// An open transaction on one node.
///
/// Holds the node's transaction slot until committed, cancelled or dropped.
/// Dropping without commit leaves staged changes unapplied; the next `open`
/// on the node starts from a clean stage.
pub struct DeviceTransaction {
    node: NodeId,
    device: Arc<dyn DeviceAccess>,
    timeout: Duration,
    _guard: OwnedMutexGuard<()>,
}

impl DeviceTransaction {
    /// Node this transaction is bound to.
    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Reads the committed value at `path`.
    pub async fn read(&self, path: &DevicePath) -> DeviceResult<Option<serde_json::Value>> {
        bounded(&self.node, "read", self.timeout, self.device.read(&self.node, path)).await
    }

    /// Stages a write.
    pub async fn put(&self, path: &DevicePath, value: serde_json::Value) -> DeviceResult<()> {
        bounded(
            &self.node,
            "write",
            self.timeout,
            self.device.write(&self.node, path, value),
        )
        .await
    }

    /// Stages a delete.
    pub async fn delete(&self, path: &DevicePath) -> DeviceResult<()> {
        bounded(&self.node, "delete", self.timeout, self.device.delete(&self.node, path)).await
    }

    /// Applies the staged changes. Staged changes are discarded if the
    /// commit fails.
    pub async fn commit(self) -> DeviceResult<()> {
        let result = bounded(&self.node, "commit", self.timeout, self.device.commit(&self.node)).await;
        if let Err(e) = &result {
            warn!(node = %self.node, error = %e, "commit failed, discarding staged changes");
            self.device.discard(&self.node).await;
        } else {
            debug!(node = %self.node, "device transaction committed");
        }
        result
    }

    /// Drops the staged changes and releases the node.
    pub async fn cancel(self) {
        self.device.discard(&self.node).await;
    }
}

async fn bounded<T, F>(node: &NodeId, operation: &str, budget: Duration, fut: F) -> DeviceResult<T>
where
    F: Future<Output = DeviceResult<T>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeviceError::Timeout {
            node: node.clone(),
            operation: operation.to_string(),
            budget_ms: budget.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDevice;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager(device: Arc<InMemoryDevice>) -> DeviceTransactionManager {
        DeviceTransactionManager::new(device, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_commit_applies_writes() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        let mgr = manager(Arc::clone(&device));
        let node = NodeId::from("node1");
        let path = DevicePath::interface("if1");

        let tx = mgr.begin(&node).await.unwrap();
        tx.put(&path, serde_json::json!({"name": "if1"})).await.unwrap();
        assert!(tx.read(&path).await.unwrap().is_none());
        tx.commit().await.unwrap();

        assert!(device.contains(&node, &path));
    }

    #[tokio::test]
    async fn test_unmounted_node() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        let mgr = manager(device);
        let node = NodeId::from("node2");

        assert!(!mgr.is_mounted(&node).await);
        let err = mgr.begin(&node).await.err().unwrap();
        assert!(err.is_not_mounted());
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let device = Arc::new(InMemoryDevice::with_nodes(["slow"]));
        device.set_latency(&NodeId::from("slow"), Duration::from_millis(500));
        let mgr = manager(device);

        let err = mgr.begin(&NodeId::from("slow")).await.err().unwrap();
        assert!(matches!(err, DeviceError::Timeout { ref operation, .. } if operation == "open"));
    }

    #[tokio::test]
    async fn test_one_transaction_per_node() {
        let device = Arc::new(InMemoryDevice::with_nodes(["node1"]));
        let mgr = Arc::new(manager(device));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = Arc::clone(&mgr);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let tx = mgr.begin(&NodeId::from("node1")).await.unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                tx.cancel().await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
