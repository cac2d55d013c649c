//! Valveguard control service
//!
//! Wires the pure control logic from `valveguard-core` to the transports in
//! `valveguard-connectors`:
//!
//! - the [`controller`] task consumes decoded readings and runs one
//!   evaluation pass per accepted reading (delivery-triggered evaluation,
//!   minimizing detection latency),
//! - the [`publisher`] owns the valve state and enforces the skip-if-equal
//!   and forced-republish policy,
//! - [`api`] exposes the manual-command and status surfaces consumed by the
//!   external operator-facing wrapper,
//! - the [`sidecar`] heartbeats the service registry off the control path.
//!
//! Shared mutable state is exactly two resources - the reading store and
//! the valve state - each behind its own mutex, and no network call ever
//! happens while either lock is held.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod controller;
pub mod publisher;
pub mod sidecar;

pub use api::{CommandError, ControlHandle, StatusReport};
pub use config::{ConfigError, ServiceConfig};
pub use controller::Controller;
pub use publisher::{ActuationPublisher, Outcome};
