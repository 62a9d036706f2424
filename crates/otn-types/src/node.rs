//! Network element identifier.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a network element (ROADM, transponder, muxponder).
///
/// Node ids are opaque strings assigned when the device is mounted on the
/// controller. They key every per-node resource: the device transaction
/// lock, rollback records and audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new node id.
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_node_id_display() {
        let node = NodeId::new("ROADM-A1");
        assert_eq!(node.to_string(), "ROADM-A1");
        assert_eq!(node.as_str(), "ROADM-A1");
    }

    #[test]
    fn test_node_id_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(NodeId::from("XPDR-A1"), 1);
        assert_eq!(map.get("XPDR-A1"), Some(&1));
    }

    #[test]
    fn test_node_id_serde_transparent() {
        let json = serde_json::to_string(&NodeId::from("node1")).unwrap();
        assert_eq!(json, "\"node1\"");
    }
}
