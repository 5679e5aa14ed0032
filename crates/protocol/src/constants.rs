//! Protocol constants.

use std::time::Duration;

/// TCP port of the hub's REST and event-stream API.
pub const API_PORT: u16 = 8443;

/// Liveness probe period. A silent hub is reported unavailable within one
/// period of true inactivity.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(10);

/// Fixed wait before each authentication polling attempt.
pub const AUTH_POLL_DELAY: Duration = Duration::from_secs(5);

/// Hard cap on authentication polling attempts.
pub const AUTH_MAX_ATTEMPTS: u32 = 11;

/// Timeout for individual REST calls to the hub.
pub const REST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default identify-blink period, in seconds.
pub const IDENTIFY_DEFAULT_PERIOD_SECS: u32 = 5;

/// OAuth audience expected by the hub's authorize endpoint.
pub const OAUTH_AUDIENCE: &str = "homesmart.local";

/// PKCE challenge method sent in the authorize request.
pub const CODE_CHALLENGE_METHOD: &str = "S256";
