//! Interactive authentication against the hub.
//!
//! The hub hands out a challenge code, then requires a physical press of
//! its action button before the token exchange succeeds. Polling is
//! bounded: [`AUTH_MAX_ATTEMPTS`] attempts at a fixed [`AUTH_POLL_DELAY`]
//! spacing, a terminal timeout thereafter.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use homelink_protocol::constants::{
    API_PORT, AUTH_MAX_ATTEMPTS, AUTH_POLL_DELAY, CODE_CHALLENGE_METHOD, OAUTH_AUDIENCE,
    REST_TIMEOUT,
};
use homelink_protocol::hub::{AuthorizeResponse, TokenResponse};

use crate::error::HubError;

/// Result of one token polling attempt.
pub(crate) enum PollOutcome {
    /// The action button was pressed; the exchange succeeded.
    Token(String),
    /// Confirmation still pending (hub answers 403 until the press).
    Pending,
}

/// Runs the bounded polling loop. Each attempt is preceded by the fixed
/// delay; attempt-level transport failures consume an attempt rather than
/// restarting the handshake, so the cap is a hard bound on total attempts.
pub(crate) async fn poll_for_token<F, Fut>(
    mut attempt_op: F,
    hub_desc: &str,
) -> Result<String, HubError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollOutcome, HubError>>,
{
    for attempt in 1..=AUTH_MAX_ATTEMPTS {
        tokio::time::sleep(AUTH_POLL_DELAY).await;
        debug!(attempt, "authentication attempt");
        match attempt_op(attempt).await {
            Ok(PollOutcome::Token(token)) => return Ok(token),
            Ok(PollOutcome::Pending) => {
                if attempt % 3 == 0 {
                    info!(hub = %hub_desc, "still waiting for that action button...");
                }
            }
            Err(error) => {
                warn!(hub = %hub_desc, %error, attempt, "token request failed");
            }
        }
    }
    Err(HubError::AuthTimeout {
        attempts: AUTH_MAX_ATTEMPTS,
    })
}

/// Obtains an access token through the interactive flow.
pub(crate) async fn obtain_access_token(
    host: &str,
    name: Option<&str>,
    accept_invalid_certs: bool,
) -> Result<String, HubError> {
    let hub_desc = match name {
        Some(name) => format!("{name} ({host})"),
        None => host.to_string(),
    };

    let http = reqwest::Client::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .timeout(REST_TIMEOUT)
        .build()?;

    let verifier = generate_code_verifier();
    let challenge = code_challenge(&verifier);

    let authorize_url = format!("https://{host}:{API_PORT}/v1/oauth/authorize");
    let resp = http
        .get(&authorize_url)
        .query(&[
            ("audience", OAUTH_AUDIENCE),
            ("response_type", "code"),
            ("code_challenge", challenge.as_str()),
            ("code_challenge_method", CODE_CHALLENGE_METHOD),
        ])
        .send()
        .await
        .map_err(|e| HubError::Connection(format!("authorize request failed: {e}")))?;
    if !resp.status().is_success() {
        return Err(HubError::Connection(format!(
            "authorize request returned {}",
            resp.status()
        )));
    }
    let AuthorizeResponse { code } = resp
        .json()
        .await
        .map_err(|e| HubError::Connection(format!("bad authorize response: {e}")))?;

    info!(hub = %hub_desc, "press the action button on the bottom of the hub");

    let client_name = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "homelink".into());
    let token_url = format!("https://{host}:{API_PORT}/v1/oauth/token");

    let token = poll_for_token(
        |_attempt| {
            let http = http.clone();
            let token_url = token_url.clone();
            let code = code.clone();
            let verifier = verifier.clone();
            let client_name = client_name.clone();
            async move {
                let resp = http
                    .post(&token_url)
                    .form(&[
                        ("code", code.as_str()),
                        ("name", client_name.as_str()),
                        ("grant_type", "authorization_code"),
                        ("code_verifier", verifier.as_str()),
                    ])
                    .send()
                    .await?;
                if resp.status() == reqwest::StatusCode::FORBIDDEN {
                    return Ok(PollOutcome::Pending);
                }
                if !resp.status().is_success() {
                    return Err(HubError::Status {
                        status: resp.status().as_u16(),
                        message: resp.text().await.unwrap_or_default(),
                    });
                }
                let token: TokenResponse = resp.json().await?;
                Ok(PollOutcome::Token(token.access_token))
            }
        },
        &hub_desc,
    )
    .await?;

    info!(
        hub = %hub_desc,
        "authentication token resolved; add it to the hub configuration as `token` to skip this handshake on future starts"
    );
    Ok(token)
}

/// Random PKCE code verifier (64 hex characters, well within the 43–128
/// length the exchange accepts).
fn generate_code_verifier() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// S256 challenge: base64url, unpadded, of the verifier's SHA-256.
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
