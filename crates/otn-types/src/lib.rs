//! Common types for optical/OTN transport service provisioning.
//!
//! This crate provides the value types shared by the renderer and the
//! service handler:
//!
//! - [`NodeId`]: Identifier of a network element mounted on the controller
//! - [`TerminationPointRole`]: Port classification derived from tp naming
//! - [`InterfaceKind`]: Device interface layers created on a termination point
//! - [`Channel`]: Wavelength or ODU timeslot carried by a service
//! - [`ServicePath`]: Ordered per-node hops for one direction of a service
//! - [`NotificationEnvelope`]: Asynchronous result notification

mod channel;
mod node;
mod notification;
mod path;
mod tp;

pub use channel::Channel;
pub use node::NodeId;
pub use notification::{
    NotificationEnvelope, NotificationKind, NotificationPayload, RpcStatus,
};
pub use path::{Direction, PathHop, ServicePath};
pub use tp::{InterfaceKind, TerminationPointRole};

/// Common error type for parsing and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid termination point: {0}")]
    InvalidTerminationPoint(String),

    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("invalid service path: {0}")]
    InvalidPath(String),
}
