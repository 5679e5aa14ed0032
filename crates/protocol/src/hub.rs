//! Hub status and authentication payloads.

use serde::{Deserialize, Serialize};

/// Response of `GET /hub/status`, also used as the heartbeat probe.
/// Every field is defaulted — the probe only cares that the response
/// parses, not that it is complete.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubStatus {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub attributes: HubStatusAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatusAttributes {
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub firmware_version: String,
    #[serde(default)]
    pub model: String,
}

/// Response of `GET /oauth/authorize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub code: String,
}

/// Response of `POST /oauth/token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}
