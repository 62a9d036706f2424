//! Renderer result types.

use otn_types::{InterfaceKind, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result message when a request needed no device change or fully succeeded.
pub const REQUEST_PROCESSED: &str = "Request processed";

/// Prefix of the success message of a path setup.
pub const CONNECTIONS_CREATED_PREFIX: &str = "Roadm-connection successfully created for nodes: ";

/// Interface created on a node during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedInterface {
    pub name: String,
    pub kind: InterfaceKind,
    /// Termination point the interface is supported by
    pub tp: String,
}

/// Everything created on one node by one setup attempt, in creation order.
///
/// This is the unit of compensation: tearing a record down removes exactly
/// what the attempt created on that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInterfaceRecord {
    node_id: NodeId,
    interfaces: Vec<CreatedInterface>,
    connection_ids: Vec<String>,
}

impl NodeInterfaceRecord {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            interfaces: Vec::new(),
            connection_ids: Vec::new(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn push_interface(&mut self, name: impl Into<String>, kind: InterfaceKind, tp: impl Into<String>) {
        self.interfaces.push(CreatedInterface {
            name: name.into(),
            kind,
            tp: tp.into(),
        });
    }

    pub fn push_connection(&mut self, connection_id: impl Into<String>) {
        self.connection_ids.push(connection_id.into());
    }

    /// Interfaces in creation order.
    pub fn interfaces(&self) -> &[CreatedInterface] {
        &self.interfaces
    }

    /// Cross-connect ids in creation order.
    pub fn connection_ids(&self) -> &[String] {
        &self.connection_ids
    }

    /// Names of the interfaces of one kind, in creation order.
    pub fn interfaces_of(&self, kind: InterfaceKind) -> impl Iterator<Item = &str> {
        self.interfaces
            .iter()
            .filter(move |i| i.kind == kind)
            .map(|i| i.name.as_str())
    }

    /// Interface names grouped by kind.
    pub fn by_kind(&self) -> BTreeMap<InterfaceKind, Vec<String>> {
        let mut grouped: BTreeMap<InterfaceKind, Vec<String>> = BTreeMap::new();
        for iface in &self.interfaces {
            grouped.entry(iface.kind).or_default().push(iface.name.clone());
        }
        grouped
    }

    pub fn contains_interface(&self, name: &str) -> bool {
        self.interfaces.iter().any(|i| i.name == name)
    }

    /// Returns true if nothing was created.
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty() && self.connection_ids.is_empty()
    }

    /// Folds another record of the same node into this one.
    ///
    /// Objects already present are kept once, so an interface shared by
    /// several cross-connects is torn down a single time.
    pub fn absorb(&mut self, other: NodeInterfaceRecord) {
        for id in other.connection_ids {
            if !self.connection_ids.contains(&id) {
                self.connection_ids.push(id);
            }
        }
        for iface in other.interfaces {
            if !self.contains_interface(&iface.name) {
                self.interfaces.push(iface);
            }
        }
    }
}

/// Merges records per node, keeping the order in which nodes first appear.
pub(crate) fn merge_by_node(records: impl IntoIterator<Item = NodeInterfaceRecord>) -> Vec<NodeInterfaceRecord> {
    let mut merged: Vec<NodeInterfaceRecord> = Vec::new();
    for record in records {
        match merged.iter_mut().find(|r| r.node_id == record.node_id) {
            Some(existing) => existing.absorb(record),
            None => merged.push(record),
        }
    }
    merged
}

/// Result of a path setup or teardown for one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePathOutcome {
    pub success: bool,
    pub result: String,
    pub node_interfaces: Vec<NodeInterfaceRecord>,
}

impl ServicePathOutcome {
    pub fn success(result: impl Into<String>, node_interfaces: Vec<NodeInterfaceRecord>) -> Self {
        Self {
            success: true,
            result: result.into(),
            node_interfaces,
        }
    }

    pub fn failure(result: impl Into<String>, node_interfaces: Vec<NodeInterfaceRecord>) -> Self {
        Self {
            success: false,
            result: result.into(),
            node_interfaces,
        }
    }
}

/// Objects a rollback could not remove from one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedToRollback {
    pub node_id: NodeId,
    /// Interface names and cross-connect ids left behind
    pub interfaces: Vec<String>,
}

/// Result of compensating a rollback history.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub success: bool,
    pub failed_to_rollback: Vec<FailedToRollback>,
}

impl RollbackOutcome {
    pub fn from_failures(failed_to_rollback: Vec<FailedToRollback>) -> Self {
        Self {
            success: failed_to_rollback.is_empty(),
            failed_to_rollback,
        }
    }

    /// Converts a partial failure into an error naming the affected nodes.
    pub fn into_result(self) -> Result<(), crate::RendererError> {
        if self.success {
            Ok(())
        } else {
            Err(crate::RendererError::RollbackPartialFailure {
                nodes: self
                    .failed_to_rollback
                    .into_iter()
                    .map(|f| f.node_id)
                    .collect(),
            })
        }
    }
}
