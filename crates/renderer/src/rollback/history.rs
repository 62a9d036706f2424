//! Rollback history of one setup attempt.

use crate::types::{merge_by_node, NodeInterfaceRecord, ServicePathOutcome};

/// Ordered, append-only ledger of what a setup attempt created.
///
/// Not `Clone`: compensation consumes the history by value, so a history
/// can be rolled back at most once.
#[derive(Debug, Default)]
pub struct RollbackHistory {
    records: Vec<NodeInterfaceRecord>,
}

impl RollbackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the history of a (possibly failed) path setup.
    pub fn from_outcome(outcome: &ServicePathOutcome) -> Self {
        Self {
            records: outcome.node_interfaces.clone(),
        }
    }

    /// Joins the histories of both directions of one service.
    ///
    /// The two directions share the interfaces of every ROADM they cross
    /// and differ only in the cross-connect, so their records are merged per
    /// node: rolling back the result removes every cross-connect of a node
    /// before any interface.
    pub fn combine(histories: impl IntoIterator<Item = RollbackHistory>) -> Self {
        Self {
            records: merge_by_node(histories.into_iter().flat_map(|h| h.records)),
        }
    }

    pub fn push(&mut self, record: NodeInterfaceRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[NodeInterfaceRecord] {
        &self.records
    }

    /// Consumes the history, returning the records in append order.
    pub fn into_records(self) -> Vec<NodeInterfaceRecord> {
        self.records
    }
}

impl From<Vec<NodeInterfaceRecord>> for RollbackHistory {
    fn from(records: Vec<NodeInterfaceRecord>) -> Self {
        Self { records }
    }
}

impl Extend<NodeInterfaceRecord> for RollbackHistory {
    fn extend<T: IntoIterator<Item = NodeInterfaceRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}
