//! Error taxonomy for hub communication.
//!
//! Heartbeat probe failures and malformed stream frames never appear here:
//! probes only flip [`Availability`](crate::Availability), and bad frames
//! are dropped at the dispatch layer.

/// Errors surfaced by the hub client.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Malformed configuration. Fatal for this hub's setup; no connection
    /// is attempted.
    #[error("invalid hub configuration: {0}")]
    Validation(String),

    /// Transport-level failure establishing the session or fetching the
    /// hub identity. Fatal for this hub's startup.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The action button was never pressed within the attempt cap.
    #[error("authentication timed out after {attempts} attempts: action button was never pressed")]
    AuthTimeout { attempts: u32 },

    /// An attribute write failed. Surfaced to the immediate caller, never
    /// retried automatically; does not affect availability.
    #[error("write to device [{device_id}] failed: {reason}")]
    Write { device_id: String, reason: String },

    /// The hub answered with a non-success HTTP status.
    #[error("hub returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
