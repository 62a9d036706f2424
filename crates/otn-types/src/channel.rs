//! Wavelength / timeslot assignment.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spectrum or time-division resource carried by a service.
///
/// Photonic services are assigned a wavelength index by path computation;
/// OTN services ride a tributary port/slot of an ODU container.
///
/// # Examples
///
/// ```
/// use otn_types::Channel;
///
/// let wl: Channel = "13".parse().unwrap();
/// assert_eq!(wl, Channel::Wavelength(13));
///
/// let ts: Channel = "1.4".parse().unwrap();
/// assert_eq!(ts.to_string(), "1.4");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Channel {
    /// Wavelength index (1-based).
    Wavelength(u32),
    /// ODU tributary port and slot.
    Timeslot { tributary_port: u16, tributary_slot: u16 },
}

impl Channel {
    /// Creates a wavelength channel, rejecting index 0.
    pub fn wavelength(index: u32) -> Result<Self, ParseError> {
        if index == 0 {
            return Err(ParseError::InvalidChannel(
                "wavelength index must be >= 1".to_string(),
            ));
        }
        Ok(Channel::Wavelength(index))
    }

    /// Returns the wavelength index, if this is a photonic channel.
    pub const fn wavelength_index(&self) -> Option<u32> {
        match self {
            Channel::Wavelength(n) => Some(*n),
            Channel::Timeslot { .. } => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Wavelength(n) => write!(f, "{}", n),
            Channel::Timeslot {
                tributary_port,
                tributary_slot,
            } => write!(f, "{}.{}", tributary_port, tributary_slot),
        }
    }
}

impl FromStr for Channel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidChannel(s.to_string());
        match s.split_once('.') {
            Some((port, slot)) => Ok(Channel::Timeslot {
                tributary_port: port.parse().map_err(|_| invalid())?,
                tributary_slot: slot.parse().map_err(|_| invalid())?,
            }),
            None => {
                let index: u32 = s.parse().map_err(|_| invalid())?;
                Channel::wavelength(index)
            }
        }
    }
}

impl TryFrom<String> for Channel {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.to_string()
    }
}
