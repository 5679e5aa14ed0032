//! REST client scoped to one hub.
//!
//! Hubs ship self-signed certificates; acceptance is a per-client option
//! on exactly this client, never a process-wide override.

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use homelink_protocol::constants::{API_PORT, REST_TIMEOUT};

use crate::error::HubError;

#[derive(Clone)]
pub(crate) struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub(crate) fn new(
        host: &str,
        token: &str,
        accept_invalid_certs: bool,
    ) -> Result<Self, HubError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .timeout(REST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: format!("https://{host}:{API_PORT}/v1"),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HubError> {
        trace!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        Ok(resp.json().await?)
    }

    /// Like [`get_json`](Self::get_json), but a 404 is `None`, not an error.
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, HubError> {
        trace!(path, "GET");
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = Self::expect_success(resp).await?;
        Ok(Some(resp.json().await?))
    }

    pub(crate) async fn patch_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), HubError> {
        trace!(path, "PATCH");
        let resp = self
            .http
            .patch(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Self::expect_success(resp).await?;
        Ok(())
    }

    /// Sends a PUT and returns the response status. Transport failures are
    /// errors; non-success statuses are the caller's to judge (identify is
    /// best-effort).
    pub(crate) async fn put_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<StatusCode, HubError> {
        trace!(path, "PUT");
        let resp = self
            .http
            .put(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(resp.status())
    }

    async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, HubError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let message = resp.text().await.unwrap_or_default();
            Err(HubError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_includes_api_port_and_version() {
        let rest = RestClient::new("192.168.1.10", "tok", true).unwrap();
        assert_eq!(rest.url("/hub/status"), "https://192.168.1.10:8443/v1/hub/status");
    }
}
