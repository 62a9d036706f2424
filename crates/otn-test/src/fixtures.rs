//! Test fixtures for common service paths
//!
//! Provides reusable topologies for renderer and service handler testing

use otn_types::{Channel, PathHop, ServicePath, TerminationPointRole};

/// Service name used by the fixtures
pub const SERVICE_NAME: &str = "service1";

/// Correlation id used by the fixtures
pub const CORRELATION_ID: &str = "request-1";

/// A termination point name carrying the given role
pub fn tp_for_role(role: TerminationPointRole) -> &'static str {
    match role {
        TerminationPointRole::Network => "XPDR1-NETWORK1",
        TerminationPointRole::Client => "XPDR1-CLIENT1",
        TerminationPointRole::Trunk => "DEG1-TTP-TXRX",
        TerminationPointRole::AddDrop => "SRG1-PP1-TXRX",
    }
}

/// All four roles
pub const ALL_ROLES: [TerminationPointRole; 4] = [
    TerminationPointRole::Network,
    TerminationPointRole::Client,
    TerminationPointRole::Trunk,
    TerminationPointRole::AddDrop,
];

/// A hop whose source and destination carry the given roles
///
/// When both roles are equal the destination uses a second port so the two
/// sides stay distinct.
pub fn hop_with_roles(node: &str, src: TerminationPointRole, dst: TerminationPointRole) -> PathHop {
    let dst_tp = if src == dst {
        match dst {
            TerminationPointRole::Network => "XPDR1-NETWORK2",
            TerminationPointRole::Client => "XPDR1-CLIENT2",
            TerminationPointRole::Trunk => "DEG2-TTP-TXRX",
            TerminationPointRole::AddDrop => "SRG1-PP2-TXRX",
        }
    } else {
        tp_for_role(dst)
    };
    PathHop::new(node, tp_for_role(src), dst_tp)
}

/// One hop with add/drop ports on both sides (`src-PP` → `dst-PP`)
pub fn single_node_path(node: &str) -> ServicePath {
    ServicePath::new(
        SERVICE_NAME,
        Channel::Wavelength(1),
        vec![PathHop::new(node, "src-PP", "dst-PP")],
    )
}

/// Express path through the given ROADMs (add/drop → degree on each)
pub fn roadm_path(nodes: &[&str]) -> ServicePath {
    ServicePath::new(
        SERVICE_NAME,
        Channel::Wavelength(1),
        nodes
            .iter()
            .map(|node| PathHop::new(*node, "SRG1-PP1-TXRX", "DEG1-TTP-TXRX"))
            .collect(),
    )
}

/// End-to-end path: transponder, two ROADMs, transponder
pub fn transponder_path() -> ServicePath {
    ServicePath::new(
        SERVICE_NAME,
        Channel::Wavelength(1),
        vec![
            PathHop::new("XPDR-A1", "XPDR1-CLIENT1", "XPDR1-NETWORK1"),
            PathHop::new("ROADM-A1", "SRG1-PP1-TXRX", "DEG2-TTP-TXRX"),
            PathHop::new("ROADM-C1", "DEG1-TTP-TXRX", "SRG1-PP1-TXRX"),
            PathHop::new("XPDR-C1", "XPDR1-NETWORK1", "XPDR1-CLIENT1"),
        ],
    )
}

/// Nodes crossed by [`transponder_path`]
pub const TRANSPONDER_PATH_NODES: [&str; 4] = ["XPDR-A1", "ROADM-A1", "ROADM-C1", "XPDR-C1"];

/// Path whose hops carry no termination point at all
pub fn empty_tp_path(nodes: &[&str]) -> ServicePath {
    ServicePath::new(
        SERVICE_NAME,
        Channel::Wavelength(1),
        nodes.iter().map(|node| PathHop::empty(*node)).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_with_roles_covers_all_pairs() {
        for src in ALL_ROLES {
            for dst in ALL_ROLES {
                let hop = hop_with_roles("node1", src, dst);
                assert_eq!(hop.roles().unwrap(), (Some(src), Some(dst)));
                assert_ne!(hop.src(), hop.dest());
            }
        }
    }

    #[test]
    fn test_fixture_paths_are_valid() {
        assert!(single_node_path("node1").validate().is_ok());
        assert!(roadm_path(&["node1", "node2"]).validate().is_ok());
        assert!(transponder_path().validate().is_ok());
        assert!(empty_tp_path(&["node1"]).is_noop());
    }
}
