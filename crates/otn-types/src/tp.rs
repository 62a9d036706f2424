//! Termination point roles and device interface kinds.

use crate::{Channel, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a termination point, derived from its identifier.
///
/// Device models name their ports after the role they play, e.g.
/// `XPDR1-NETWORK1`, `XPDR1-CLIENT1`, `DEG1-TTP-TXRX`, `SRG1-PP1-TXRX`.
/// The role decides which interfaces a node needs and whether a
/// cross-connect is created between the source and destination ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationPointRole {
    /// Line-side port of a transponder/muxponder.
    Network,
    /// Client-side port of a transponder/muxponder.
    Client,
    /// Trunk termination point (ROADM degree).
    Trunk,
    /// Add/drop termination point (ROADM SRG port).
    AddDrop,
}

impl TerminationPointRole {
    const NETWORK_TOKEN: &'static str = "NETWORK";
    const CLIENT_TOKEN: &'static str = "CLIENT";
    const TTP_TOKEN: &'static str = "TTP";
    const PP_TOKEN: &'static str = "PP";

    /// Classifies a termination point identifier.
    ///
    /// Tokens are matched case-sensitively in the order
    /// `NETWORK`, `CLIENT`, `TTP`, `PP`.
    pub fn classify(tp_id: &str) -> Result<Self, ParseError> {
        if tp_id.contains(Self::NETWORK_TOKEN) {
            Ok(TerminationPointRole::Network)
        } else if tp_id.contains(Self::CLIENT_TOKEN) {
            Ok(TerminationPointRole::Client)
        } else if tp_id.contains(Self::TTP_TOKEN) {
            Ok(TerminationPointRole::Trunk)
        } else if tp_id.contains(Self::PP_TOKEN) {
            Ok(TerminationPointRole::AddDrop)
        } else {
            Err(ParseError::InvalidTerminationPoint(tp_id.to_string()))
        }
    }

    /// Returns true for ROADM-side roles (trunk or add/drop).
    pub const fn is_roadm(&self) -> bool {
        matches!(self, TerminationPointRole::Trunk | TerminationPointRole::AddDrop)
    }

    /// Returns true if a cross-connect must join the two roles on one node.
    ///
    /// A cross-connect exists only between two ROADM-side ports; as soon as
    /// either side is a network or client port, only interfaces are created.
    pub fn needs_cross_connect(src: Option<Self>, dst: Option<Self>) -> bool {
        matches!((src, dst), (Some(s), Some(d)) if s.is_roadm() && d.is_roadm())
    }

    /// Interfaces that must exist on a port of this role, in creation order.
    pub const fn interface_kinds(&self) -> &'static [InterfaceKind] {
        match self {
            TerminationPointRole::Network => &[
                InterfaceKind::OpticalChannel,
                InterfaceKind::LineSignal,
                InterfaceKind::DigitalSignal,
            ],
            TerminationPointRole::Client => &[InterfaceKind::ClientSignal],
            TerminationPointRole::Trunk | TerminationPointRole::AddDrop => {
                &[InterfaceKind::OpticalChannel]
            }
        }
    }
}

impl fmt::Display for TerminationPointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationPointRole::Network => "network",
            TerminationPointRole::Client => "client",
            TerminationPointRole::Trunk => "ttp",
            TerminationPointRole::AddDrop => "pp",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TerminationPointRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::classify(s)
    }
}

/// Layer of a device interface created on a termination point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceKind {
    /// Optical channel (media channel on ROADMs, OCh on transponders).
    OpticalChannel,
    /// OTU line signal.
    LineSignal,
    /// ODU digital signal.
    DigitalSignal,
    /// Client signal (Ethernet).
    ClientSignal,
}

impl InterfaceKind {
    /// All interface kinds, in layer order.
    pub const ALL: [InterfaceKind; 4] = [
        InterfaceKind::OpticalChannel,
        InterfaceKind::LineSignal,
        InterfaceKind::DigitalSignal,
        InterfaceKind::ClientSignal,
    ];

    /// Device-model interface type written into the interface object.
    pub const fn device_type(&self) -> &'static str {
        match self {
            InterfaceKind::OpticalChannel => "opticalChannel",
            InterfaceKind::LineSignal => "otnOtu",
            InterfaceKind::DigitalSignal => "otnOdu",
            InterfaceKind::ClientSignal => "ethernetCsmacd",
        }
    }

    /// Builds the deterministic interface name for a termination point.
    ///
    /// Names are derived from the tp and channel only, so the same name can
    /// be recomputed at teardown time from the service path.
    pub fn interface_name(&self, tp_id: &str, channel: &Channel) -> String {
        match self {
            InterfaceKind::OpticalChannel => format!("{}-{}", tp_id, channel),
            InterfaceKind::LineSignal => format!("{}-OTU", tp_id),
            InterfaceKind::DigitalSignal => match channel {
                Channel::Wavelength(_) => format!("{}-ODU", tp_id),
                Channel::Timeslot { .. } => format!("{}-ODU-{}", tp_id, channel),
            },
            InterfaceKind::ClientSignal => format!("{}-ETHERNET", tp_id),
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterfaceKind::OpticalChannel => "optical-channel",
            InterfaceKind::LineSignal => "line-signal",
            InterfaceKind::DigitalSignal => "digital-signal",
            InterfaceKind::ClientSignal => "client-signal",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify() {
        assert_eq!(
            TerminationPointRole::classify("XPDR1-NETWORK1").unwrap(),
            TerminationPointRole::Network
        );
        assert_eq!(
            TerminationPointRole::classify("XPDR1-CLIENT1").unwrap(),
            TerminationPointRole::Client
        );
        assert_eq!(
            TerminationPointRole::classify("DEG1-TTP-TXRX").unwrap(),
            TerminationPointRole::Trunk
        );
        assert_eq!(
            TerminationPointRole::classify("SRG1-PP1-TXRX").unwrap(),
            TerminationPointRole::AddDrop
        );
        assert_eq!(
            "src-PP".parse::<TerminationPointRole>().unwrap(),
            TerminationPointRole::AddDrop
        );
        assert!(TerminationPointRole::classify("Ethernet0").is_err());
    }

    #[test]
    fn test_needs_cross_connect_all_pairs() {
        use TerminationPointRole::*;
        let roles = [Network, Client, Trunk, AddDrop];
        for src in roles {
            for dst in roles {
                let expected = src.is_roadm() && dst.is_roadm();
                assert_eq!(
                    TerminationPointRole::needs_cross_connect(Some(src), Some(dst)),
                    expected,
                    "pair ({}, {})",
                    src,
                    dst
                );
            }
        }
        assert!(!TerminationPointRole::needs_cross_connect(Some(Trunk), None));
        assert!(!TerminationPointRole::needs_cross_connect(None, None));
    }

    #[test]
    fn test_interface_kinds_per_role() {
        assert_eq!(TerminationPointRole::Network.interface_kinds().len(), 3);
        assert_eq!(
            TerminationPointRole::Client.interface_kinds(),
            &[InterfaceKind::ClientSignal]
        );
        assert_eq!(
            TerminationPointRole::AddDrop.interface_kinds(),
            &[InterfaceKind::OpticalChannel]
        );
    }

    #[test]
    fn test_interface_names() {
        let wl = Channel::Wavelength(7);
        assert_eq!(
            InterfaceKind::OpticalChannel.interface_name("SRG1-PP1-TXRX", &wl),
            "SRG1-PP1-TXRX-7"
        );
        assert_eq!(
            InterfaceKind::LineSignal.interface_name("XPDR1-NETWORK1", &wl),
            "XPDR1-NETWORK1-OTU"
        );
        assert_eq!(
            InterfaceKind::DigitalSignal.interface_name("XPDR1-NETWORK1", &wl),
            "XPDR1-NETWORK1-ODU"
        );
        let ts = Channel::Timeslot {
            tributary_port: 1,
            tributary_slot: 4,
        };
        assert_eq!(
            InterfaceKind::DigitalSignal.interface_name("XPDR1-NETWORK1", &ts),
            "XPDR1-NETWORK1-ODU-1.4"
        );
        assert_eq!(
            InterfaceKind::ClientSignal.interface_name("XPDR1-CLIENT1", &wl),
            "XPDR1-CLIENT1-ETHERNET"
        );
    }
}
