//! Client for a smart-home hub's device registry and event stream.
//!
//! Owns the connection lifecycle: interactive authentication, REST access
//! to the device registry, the push-event subscription, and heartbeat-based
//! availability tracking.

pub mod availability;
pub mod connection;
pub mod error;
pub mod signal;

pub(crate) mod auth;
pub(crate) mod heartbeat;
pub(crate) mod rest;
pub(crate) mod stream;

pub use availability::{Availability, AvailabilityEvent};
pub use connection::{HubConfig, HubConnection, HubIdentity};
pub use error::HubError;
pub use signal::{Signal, Subscription};
