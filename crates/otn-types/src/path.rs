//! Computed service paths.

use crate::{Channel, NodeId, ParseError, TerminationPointRole};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Direction of a service path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From the A-end to the Z-end.
    #[serde(rename = "a-to-z")]
    AToZ,
    /// From the Z-end back to the A-end.
    #[serde(rename = "z-to-a")]
    ZToA,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToZ => write!(f, "A-to-Z"),
            Direction::ZToA => write!(f, "Z-to-A"),
        }
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a-to-z" | "atoz" | "az" => Ok(Direction::AToZ),
            "z-to-a" | "ztoa" | "za" => Ok(Direction::ZToA),
            _ => Err(ParseError::InvalidDirection(s.to_string())),
        }
    }
}

/// One node of a computed path and the two ports used on it.
///
/// Either termination point may be absent: some service types only touch
/// one side of a node, and a hop with neither is a legal no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    pub node_id: NodeId,
    #[serde(default)]
    pub src_tp: Option<String>,
    #[serde(default)]
    pub dest_tp: Option<String>,
}

impl PathHop {
    /// Creates a hop with both termination points.
    pub fn new(node_id: impl Into<NodeId>, src_tp: impl Into<String>, dest_tp: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            src_tp: Some(src_tp.into()),
            dest_tp: Some(dest_tp.into()),
        }
    }

    /// Creates a hop without termination points.
    pub fn empty(node_id: impl Into<NodeId>) -> Self {
        Self {
            node_id: node_id.into(),
            src_tp: None,
            dest_tp: None,
        }
    }

    /// Source tp, with empty strings treated as absent.
    pub fn src(&self) -> Option<&str> {
        self.src_tp.as_deref().filter(|tp| !tp.is_empty())
    }

    /// Destination tp, with empty strings treated as absent.
    pub fn dest(&self) -> Option<&str> {
        self.dest_tp.as_deref().filter(|tp| !tp.is_empty())
    }

    /// Returns true if neither termination point is set.
    pub fn is_noop(&self) -> bool {
        self.src().is_none() && self.dest().is_none()
    }

    /// Classifies both termination points.
    pub fn roles(
        &self,
    ) -> Result<(Option<TerminationPointRole>, Option<TerminationPointRole>), ParseError> {
        let src = self.src().map(TerminationPointRole::classify).transpose()?;
        let dest = self.dest().map(TerminationPointRole::classify).transpose()?;
        Ok((src, dest))
    }

    /// Returns the hop as seen from the opposite direction.
    pub fn reversed(&self) -> Self {
        Self {
            node_id: self.node_id.clone(),
            src_tp: self.dest_tp.clone(),
            dest_tp: self.src_tp.clone(),
        }
    }
}

/// Ordered sequence of hops for one direction of a service.
///
/// Produced by path computation and immutable once handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePath {
    pub service_name: String,
    pub channel: Channel,
    pub hops: Vec<PathHop>,
}

impl ServicePath {
    /// Creates a new service path.
    pub fn new(service_name: impl Into<String>, channel: Channel, hops: Vec<PathHop>) -> Self {
        Self {
            service_name: service_name.into(),
            channel,
            hops,
        }
    }

    /// Checks that the path is well formed.
    ///
    /// Rejects an empty service name, a node visited twice and any
    /// termination point whose name carries no known role token.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.service_name.trim().is_empty() {
            return Err(ParseError::InvalidPath("empty service name".to_string()));
        }

        let mut seen = HashSet::new();
        for hop in &self.hops {
            if !seen.insert(&hop.node_id) {
                return Err(ParseError::InvalidPath(format!(
                    "node {} appears more than once",
                    hop.node_id
                )));
            }
            hop.roles()?;
        }

        Ok(())
    }

    /// Node ids in path order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.hops.iter().map(|hop| &hop.node_id)
    }

    /// Returns true if no hop carries a termination point.
    pub fn is_noop(&self) -> bool {
        self.hops.iter().all(PathHop::is_noop)
    }

    /// First node and its source tp (the A-end of this direction).
    pub fn a_end(&self) -> Option<(&NodeId, &str)> {
        let hop = self.hops.first()?;
        hop.src().map(|tp| (&hop.node_id, tp))
    }

    /// Last node and its destination tp (the Z-end of this direction).
    pub fn z_end(&self) -> Option<(&NodeId, &str)> {
        let hop = self.hops.last()?;
        hop.dest().map(|tp| (&hop.node_id, tp))
    }

    /// Returns the path for the opposite direction over the same hops.
    pub fn reversed(&self) -> Self {
        Self {
            service_name: self.service_name.clone(),
            channel: self.channel,
            hops: self.hops.iter().rev().map(PathHop::reversed).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_path() -> ServicePath {
        ServicePath::new(
            "service1",
            Channel::Wavelength(1),
            vec![
                PathHop::new("XPDR-A1", "XPDR1-CLIENT1", "XPDR1-NETWORK1"),
                PathHop::new("ROADM-A1", "SRG1-PP1-TXRX", "DEG1-TTP-TXRX"),
                PathHop::new("ROADM-C1", "DEG2-TTP-TXRX", "SRG1-PP1-TXRX"),
                PathHop::new("XPDR-C1", "XPDR1-NETWORK1", "XPDR1-CLIENT1"),
            ],
        )
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_path().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_tps() {
        let mut path = sample_path();
        path.hops.push(PathHop::new("ROADM-A1", "SRG1-PP2-TXRX", "DEG1-TTP-TXRX"));
        assert!(path.validate().is_err());

        let path = ServicePath::new(
            "svc",
            Channel::Wavelength(1),
            vec![PathHop::new("node1", "Ethernet0", "DEG1-TTP-TXRX")],
        );
        assert!(matches!(
            path.validate(),
            Err(ParseError::InvalidTerminationPoint(_))
        ));

        let path = ServicePath::new(" ", Channel::Wavelength(1), vec![]);
        assert!(path.validate().is_err());
    }

    #[test]
    fn test_empty_tps_are_noop() {
        let hop = PathHop {
            node_id: NodeId::from("node1"),
            src_tp: Some(String::new()),
            dest_tp: None,
        };
        assert!(hop.is_noop());
        assert_eq!(hop.roles().unwrap(), (None, None));
    }

    #[test]
    fn test_ends_and_reverse() {
        let path = sample_path();
        assert_eq!(
            path.a_end().map(|(n, tp)| (n.as_str(), tp)),
            Some(("XPDR-A1", "XPDR1-CLIENT1"))
        );
        let reversed = path.reversed();
        assert_eq!(reversed.hops[0].node_id.as_str(), "XPDR-C1");
        assert_eq!(reversed.hops[0].src(), Some("XPDR1-CLIENT1"));
        assert_eq!(reversed.hops[0].dest(), Some("XPDR1-NETWORK1"));
        assert_eq!(reversed.reversed(), path);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("a-to-z".parse::<Direction>().unwrap(), Direction::AToZ);
        assert_eq!("ZA".parse::<Direction>().unwrap(), Direction::ZToA);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
