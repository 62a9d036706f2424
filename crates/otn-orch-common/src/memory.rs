//! In-memory device backend.
//!
//! Simulates a set of mounted network elements with per-node staged
//! transactions. Used by the daemon's simulation mode and by tests, which
//! can inject faults and latency and inspect the calls that were made.

use crate::device::{DeviceAccess, DeviceError, DevicePath, DeviceResult};
use async_trait::async_trait;
use otn_types::NodeId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Device operation kinds, for fault injection and call tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOperation {
    Open,
    Read,
    Write,
    Delete,
    Commit,
}

impl fmt::Display for DeviceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceOperation::Open => "open",
            DeviceOperation::Read => "read",
            DeviceOperation::Write => "write",
            DeviceOperation::Delete => "delete",
            DeviceOperation::Commit => "commit",
        };
        write!(f, "{}", s)
    }
}

/// A recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCall {
    pub node: NodeId,
    pub operation: DeviceOperation,
    pub path: Option<DevicePath>,
}

/// Rule that makes matching device calls fail.
#[derive(Debug, Clone)]
pub struct Fault {
    /// Node the rule applies to (`None` for every node)
    pub node: Option<NodeId>,
    /// Operation that fails
    pub operation: DeviceOperation,
    /// Substring the path must contain (empty matches every path)
    pub path_contains: String,
}

impl Fault {
    /// Fails `operation` on every node and path.
    pub fn on(operation: DeviceOperation) -> Self {
        Self {
            node: None,
            operation,
            path_contains: String::new(),
        }
    }

    /// Restricts the rule to one node.
    pub fn for_node(mut self, node: impl Into<NodeId>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Restricts the rule to paths containing `fragment`.
    pub fn matching(mut self, fragment: impl Into<String>) -> Self {
        self.path_contains = fragment.into();
        self
    }

    fn applies(&self, node: &NodeId, operation: DeviceOperation, path: Option<&DevicePath>) -> bool {
        if self.operation != operation {
            return false;
        }
        if self.node.as_ref().is_some_and(|n| n != node) {
            return false;
        }
        match path {
            Some(p) => p.as_str().contains(&self.path_contains),
            None => self.path_contains.is_empty(),
        }
    }
}

#[derive(Debug)]
enum StagedChange {
    Write(DevicePath, serde_json::Value),
    Delete(DevicePath),
}

#[derive(Debug, Default)]
struct NodeState {
    mounted: bool,
    committed: BTreeMap<DevicePath, serde_json::Value>,
    staged: Vec<StagedChange>,
    latency: Option<Duration>,
}

impl NodeState {
    /// Committed cross-connect that uses the interface at `path`, if any.
    fn connection_using(&self, path: &DevicePath) -> Option<&DevicePath> {
        if !path.is_interface() {
            return None;
        }
        let name = path.name();
        self.committed
            .iter()
            .filter(|(p, _)| p.is_roadm_connection())
            .find(|(_, value)| {
                value["source"]["src-if"].as_str() == Some(name)
                    || value["destination"]["dst-if"].as_str() == Some(name)
            })
            .map(|(p, _)| p)
    }
}

/// In-memory implementation of [`DeviceAccess`].
#[derive(Debug, Default)]
pub struct InMemoryDevice {
    nodes: Mutex<HashMap<NodeId, NodeState>>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Vec<DeviceCall>>,
}

impl InMemoryDevice {
    /// Creates a device backend with no node mounted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device backend with the given nodes mounted.
    pub fn with_nodes<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        let device = Self::new();
        for node in nodes {
            device.mount(node);
        }
        device
    }

    /// Mounts a node (creating it if unknown).
    pub fn mount(&self, node: impl Into<NodeId>) {
        self.nodes.lock().entry(node.into()).or_default().mounted = true;
    }

    /// Unmounts a node, keeping its configuration.
    pub fn unmount(&self, node: &NodeId) {
        if let Some(state) = self.nodes.lock().get_mut(node) {
            state.mounted = false;
        }
    }

    /// Adds latency to every call on a node.
    pub fn set_latency(&self, node: &NodeId, latency: Duration) {
        self.nodes.lock().entry(node.clone()).or_default().latency = Some(latency);
    }

    /// Installs a fault rule.
    pub fn inject_fault(&self, fault: Fault) {
        self.faults.lock().push(fault);
    }

    /// Removes all fault rules.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Writes a committed object directly, bypassing transactions.
    pub fn preload(&self, node: &NodeId, path: DevicePath, value: serde_json::Value) {
        self.nodes
            .lock()
            .entry(node.clone())
            .or_default()
            .committed
            .insert(path, value);
    }

    /// Returns true if a committed object exists at `path`.
    pub fn contains(&self, node: &NodeId, path: &DevicePath) -> bool {
        self.nodes
            .lock()
            .get(node)
            .is_some_and(|state| state.committed.contains_key(path))
    }

    /// Returns the committed object at `path`.
    pub fn get(&self, node: &NodeId, path: &DevicePath) -> Option<serde_json::Value> {
        self.nodes
            .lock()
            .get(node)
            .and_then(|state| state.committed.get(path).cloned())
    }

    /// Returns all committed paths on a node.
    pub fn paths(&self, node: &NodeId) -> Vec<DevicePath> {
        self.nodes
            .lock()
            .get(node)
            .map(|state| state.committed.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, node: &NodeId, operation: DeviceOperation, path: Option<&DevicePath>) {
        self.calls.lock().push(DeviceCall {
            node: node.clone(),
            operation,
            path: path.cloned(),
        });
    }

    fn check_fault(
        &self,
        node: &NodeId,
        operation: DeviceOperation,
        path: Option<&DevicePath>,
    ) -> DeviceResult<()> {
        let faults = self.faults.lock();
        if faults.iter().any(|f| f.applies(node, operation, path)) {
            let target = path.map(|p| p.to_string()).unwrap_or_default();
            return Err(DeviceError::rejected(
                node,
                operation.to_string(),
                format!("injected fault {}", target),
            ));
        }
        Ok(())
    }

    /// Records the call, applies latency and faults, and checks the mount.
    async fn enter(
        &self,
        node: &NodeId,
        operation: DeviceOperation,
        path: Option<&DevicePath>,
    ) -> DeviceResult<()> {
        self.record(node, operation, path);

        let latency = self.nodes.lock().get(node).and_then(|s| s.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mounted = self.nodes.lock().get(node).is_some_and(|s| s.mounted);
        if !mounted {
            return Err(DeviceError::not_mounted(node));
        }

        self.check_fault(node, operation, path)
    }
}

#[async_trait]
impl DeviceAccess for InMemoryDevice {
    async fn open(&self, node: &NodeId) -> DeviceResult<()> {
        self.enter(node, DeviceOperation::Open, None).await?;
        if let Some(state) = self.nodes.lock().get_mut(node) {
            state.staged.clear();
        }
        Ok(())
    }

    async fn read(&self, node: &NodeId, path: &DevicePath) -> DeviceResult<Option<serde_json::Value>> {
        self.enter(node, DeviceOperation::Read, Some(path)).await?;
        Ok(self.get(node, path))
    }

    async fn write(&self, node: &NodeId, path: &DevicePath, value: serde_json::Value) -> DeviceResult<()> {
        self.enter(node, DeviceOperation::Write, Some(path)).await?;
        let mut nodes = self.nodes.lock();
        let state = nodes.get_mut(node).ok_or_else(|| DeviceError::not_mounted(node))?;
        state.staged.push(StagedChange::Write(path.clone(), value));
        Ok(())
    }

    async fn delete(&self, node: &NodeId, path: &DevicePath) -> DeviceResult<()> {
        self.enter(node, DeviceOperation::Delete, Some(path)).await?;
        let mut nodes = self.nodes.lock();
        let state = nodes.get_mut(node).ok_or_else(|| DeviceError::not_mounted(node))?;
        if !state.committed.contains_key(path) {
            return Err(DeviceError::NotFound {
                node: node.clone(),
                path: path.clone(),
            });
        }
        // an interface cannot go while a cross-connect still uses it
        if let Some(connection) = state.connection_using(path) {
            return Err(DeviceError::rejected(
                node,
                DeviceOperation::Delete.to_string(),
                format!("{} is in use by {}", path, connection),
            ));
        }
        state.staged.push(StagedChange::Delete(path.clone()));
        Ok(())
    }

    async fn commit(&self, node: &NodeId) -> DeviceResult<()> {
        self.enter(node, DeviceOperation::Commit, None).await?;
        let mut nodes = self.nodes.lock();
        let state = nodes.get_mut(node).ok_or_else(|| DeviceError::not_mounted(node))?;
        for change in std::mem::take(&mut state.staged) {
            match change {
                StagedChange::Write(path, value) => {
                    state.committed.insert(path, value);
                }
                StagedChange::Delete(path) => {
                    state.committed.remove(&path);
                }
            }
        }
        Ok(())
    }

    async fn discard(&self, node: &NodeId) {
        if let Some(state) = self.nodes.lock().get_mut(node) {
            state.staged.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_staged_changes_apply_on_commit() {
        let device = InMemoryDevice::with_nodes(["node1"]);
        let node = NodeId::from("node1");
        let path = DevicePath::interface("if1");

        device.open(&node).await.unwrap();
        device.write(&node, &path, json!({"a": 1})).await.unwrap();
        assert!(!device.contains(&node, &path));
        device.commit(&node).await.unwrap();
        assert_eq!(device.get(&node, &path), Some(json!({"a": 1})));

        device.open(&node).await.unwrap();
        device.delete(&node, &path).await.unwrap();
        device.commit(&node).await.unwrap();
        assert!(device.paths(&node).is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let device = InMemoryDevice::with_nodes(["node1"]);
        let node = NodeId::from("node1");
        device.open(&node).await.unwrap();
        let err = device
            .delete(&node, &DevicePath::interface("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_interface_in_use_cannot_be_deleted() {
        let device = InMemoryDevice::with_nodes(["node1"]);
        let node = NodeId::from("node1");
        let iface = DevicePath::interface("SRG1-PP1-TXRX-1");
        let connection = DevicePath::roadm_connection("SRG1-PP1-TXRX-1-x-DEG1-TTP-TXRX-1");
        device.preload(&node, iface.clone(), json!({}));
        device.preload(
            &node,
            connection.clone(),
            json!({
                "source": { "src-if": "SRG1-PP1-TXRX-1" },
                "destination": { "dst-if": "DEG1-TTP-TXRX-1" },
            }),
        );

        device.open(&node).await.unwrap();
        let err = device.delete(&node, &iface).await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("in use"), "{}", err);

        device.delete(&node, &connection).await.unwrap();
        device.commit(&node).await.unwrap();
        device.open(&node).await.unwrap();
        device.delete(&node, &iface).await.unwrap();
        device.commit(&node).await.unwrap();
        assert!(device.paths(&node).is_empty());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let device = InMemoryDevice::with_nodes(["node1", "node2"]);
        device.inject_fault(
            Fault::on(DeviceOperation::Write)
                .for_node("node1")
                .matching("TTP"),
        );

        let node1 = NodeId::from("node1");
        let node2 = NodeId::from("node2");
        let ttp = DevicePath::interface("DEG1-TTP-TXRX-1");
        assert!(device.write(&node1, &ttp, json!({})).await.is_err());
        assert!(device.write(&node2, &ttp, json!({})).await.is_ok());
        assert!(device
            .write(&node1, &DevicePath::interface("SRG1-PP1-TXRX-1"), json!({}))
            .await
            .is_ok());

        device.clear_faults();
        assert!(device.write(&node1, &ttp, json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn test_unmount_and_call_log() {
        let device = InMemoryDevice::with_nodes(["node1"]);
        let node = NodeId::from("node1");
        device.unmount(&node);
        assert!(device.open(&node).await.unwrap_err().is_not_mounted());
        assert_eq!(device.call_count(), 1);
        assert_eq!(device.calls()[0].operation, DeviceOperation::Open);
    }
}
