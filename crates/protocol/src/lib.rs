//! Wire types for hub communication.
//!
//! Mirrors the hub's JSON surface: device records, event-stream envelopes,
//! hub status and authentication payloads, plus protocol constants.

pub mod constants;
pub mod device;
pub mod hub;
pub mod stream;
