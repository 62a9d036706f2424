//! Transport service handler.
//!
//! Accepts service create and delete requests, drives them through path
//! computation and device rendering, and reports every outcome northbound.
//!
//! # Architecture
//!
//! ```text
//! ServiceHandler ──> ServiceDataStore
//!        │
//!        └──> PathComputation ──┐
//!                               ▼
//!            TransportDaemon topic consumers
//!                               │
//!                               ▼
//!                  NotificationSequencer ──> StatusPublisher
//!                               │
//!                               └──> RendererServiceOperations
//! ```
//!
//! # Key Components
//!
//! - [`NotificationSequencer`]: per-correlation deduplication and the
//!   notification-to-transition rules
//! - [`TransportDaemon`]: wiring and topic consumers with graceful shutdown
//! - [`TransportConfig`]: YAML configuration of the `transportd` binary

pub mod config;
pub mod daemon;
pub mod datastore;
pub mod error;
pub mod handler;
pub mod pce;
pub mod publisher;
pub mod request;
pub mod sequencer;

pub use config::TransportConfig;
pub use daemon::{TransportDaemon, RENDERER_TOPIC};
pub use datastore::{InMemoryServiceStore, ServiceDataStore, ServiceRecord, ServiceState};
pub use error::{ServiceHandlerError, ServiceHandlerResult};
pub use handler::ServiceHandler;
pub use pce::{ExplicitRoutePce, PathComputation, PCE_TOPIC};
pub use publisher::{ServiceStatusReport, StatusPublisher};
pub use request::{parse_requests, ServiceCreateRequest};
pub use sequencer::{NotificationSequencer, Transition};
