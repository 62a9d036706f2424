//! Daemon module.
//!
//! Contains the TransportDaemon, which wires the service handler, the
//! renderer and the notification sequencer and runs the topic consumers.

mod transportd;

pub use transportd::{TransportDaemon, RENDERER_TOPIC};
