//! Hub connection lifecycle.
//!
//! [`HubConnection::create`] performs the full session establishment:
//! configuration validation, token acquisition (interactive when no token
//! is configured), identity fetch, event-stream subscription, and the
//! heartbeat pump. Teardown is cooperative through a shared cancellation
//! token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use homelink_protocol::constants::IDENTIFY_DEFAULT_PERIOD_SECS;
use homelink_protocol::device::{AttributeMap, DeviceRecord};
use homelink_protocol::hub::HubStatus;
use homelink_protocol::stream::{DeviceRemoval, DeviceStateChange};

use crate::auth;
use crate::availability::{Availability, AvailabilityEvent};
use crate::error::HubError;
use crate::heartbeat;
use crate::rest::RestClient;
use crate::signal::Subscription;
use crate::stream::{self, HubSignals};

/// Per-hub configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub address (IP or hostname). Required.
    pub host: Option<String>,
    /// Access token from a previous pairing. When absent, connecting runs
    /// the interactive flow and logs the token for the user to persist.
    pub token: Option<String>,
    /// Display name override. Falls back to the hub's own name.
    pub name: Option<String>,
    /// Hubs ship self-signed certificates, so this defaults on.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

fn default_accept_invalid_certs() -> bool {
    true
}

/// Resolved identity of a connected hub.
#[derive(Debug, Clone)]
pub struct HubIdentity {
    /// Stable identifier: the hub's serial number, or its reported id.
    pub id: String,
    /// Display name: configured override, else the hub's custom name,
    /// else the host.
    pub name: String,
    pub host: String,
}

/// A live session with one hub.
///
/// Holds the REST client, the availability flag, and the two background
/// pumps. All event registration methods return a [`Subscription`] that
/// detaches on drop.
pub struct HubConnection {
    identity: HubIdentity,
    rest: RestClient,
    availability: Arc<Availability>,
    signals: Arc<HubSignals>,
    cancel: CancellationToken,
    pumps: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl HubConnection {
    /// Establishes a session. Fails fast on configuration problems,
    /// authentication timeout, or an unreachable hub; transient problems
    /// after this point are availability flips, not errors.
    pub async fn create(config: &HubConfig) -> Result<Self, HubError> {
        let host = validated_host(config)?;

        let token = match &config.token {
            Some(token) => token.clone(),
            None => {
                auth::obtain_access_token(&host, config.name.as_deref(), config.accept_invalid_certs)
                    .await?
            }
        };

        let rest = RestClient::new(&host, &token, config.accept_invalid_certs)?;
        let status: HubStatus = rest
            .get_json("/hub/status")
            .await
            .map_err(|e| HubError::Connection(format!("hub status fetch failed: {e}")))?;

        let custom_name = status.attributes.custom_name.trim();
        let name = match (&config.name, custom_name) {
            (Some(name), _) if !name.trim().is_empty() => name.trim().to_string(),
            (_, custom) if !custom.is_empty() => custom.to_string(),
            _ => host.clone(),
        };
        let serial = status.attributes.serial_number.trim();
        let id = if serial.is_empty() {
            status.id.clone()
        } else {
            serial.to_string()
        };
        let identity = HubIdentity {
            id,
            name,
            host: host.clone(),
        };
        info!(hub = %identity.name, id = %identity.id, "connected to hub");

        let ws = stream::connect_stream(&host, &token, config.accept_invalid_certs)
            .await
            .map_err(|e| HubError::Connection(format!("event stream subscription failed: {e}")))?;

        let availability = Arc::new(Availability::new());
        let signals = Arc::new(HubSignals::new());
        let cancel = CancellationToken::new();
        let (liveness_tx, liveness_rx) = mpsc::channel(8);

        let stream_pump = tokio::spawn(stream::stream_pump(
            ws,
            signals.clone(),
            availability.clone(),
            liveness_tx,
            cancel.clone(),
        ));

        let probe_rest = rest.clone();
        let heartbeat_pump = tokio::spawn(heartbeat::heartbeat_pump(
            move || {
                let rest = probe_rest.clone();
                async move {
                    rest.get_json::<HubStatus>("/hub/status")
                        .await
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                }
            },
            availability.clone(),
            liveness_rx,
            cancel.clone(),
        ));

        Ok(Self {
            identity,
            rest,
            availability,
            signals,
            cancel,
            pumps: Mutex::new(vec![stream_pump, heartbeat_pump]),
            closed: AtomicBool::new(false),
        })
    }

    pub fn identity(&self) -> &HubIdentity {
        &self.identity
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn availability(&self) -> &Arc<Availability> {
        &self.availability
    }

    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    pub fn on_availability(
        &self,
        callback: impl Fn(&AvailabilityEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.availability.on_change(callback)
    }

    pub fn on_device_state_changed(
        &self,
        callback: impl Fn(&DeviceStateChange) + Send + Sync + 'static,
    ) -> Subscription {
        self.signals.device_state_changed.subscribe(callback)
    }

    pub fn on_device_added(
        &self,
        callback: impl Fn(&DeviceRecord) + Send + Sync + 'static,
    ) -> Subscription {
        self.signals.device_added.subscribe(callback)
    }

    pub fn on_device_removed(
        &self,
        callback: impl Fn(&DeviceRemoval) + Send + Sync + 'static,
    ) -> Subscription {
        self.signals.device_removed.subscribe(callback)
    }

    /// Fetches the full device registry.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, HubError> {
        self.rest.get_json("/devices").await
    }

    /// Fetches one device; `None` when the hub no longer knows it.
    pub async fn get_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, HubError> {
        self.rest.get_optional(&format!("/devices/{device_id}")).await
    }

    /// Writes attributes to a device. Failures are surfaced to the caller
    /// and never retried here.
    pub async fn set_device_attributes(
        &self,
        device_id: &str,
        attributes: &AttributeMap,
    ) -> Result<(), HubError> {
        let body = serde_json::json!([{ "attributes": attributes }]);
        self.rest
            .patch_json(&format!("/devices/{device_id}"), &body)
            .await
            .map_err(|e| HubError::Write {
                device_id: device_id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Asks a device to identify itself (blink, typically) for
    /// `period_secs` seconds. Best-effort: an unexpected status is
    /// logged, not returned.
    pub async fn identify_device(
        &self,
        device_id: &str,
        period_secs: Option<u32>,
    ) -> Result<(), HubError> {
        let period = period_secs.unwrap_or(IDENTIFY_DEFAULT_PERIOD_SECS);
        let body = serde_json::json!({ "period": period });
        let status = self
            .rest
            .put_json(&format!("/devices/{device_id}/identify"), &body)
            .await
            .map_err(|e| HubError::Write {
                device_id: device_id.to_string(),
                reason: e.to_string(),
            })?;
        if !status.is_success() {
            error!(device = %device_id, %status, "identify request rejected");
        }
        Ok(())
    }

    /// Stops the pumps, waits for both to finish, then detaches every
    /// observer. After it returns no probe runs and no event is
    /// delivered. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(hub = %self.identity.name, "closing hub connection");
        self.cancel.cancel();
        let pumps = std::mem::take(&mut *self.pumps.lock().unwrap());
        for pump in pumps {
            let _ = pump.await;
        }
        self.availability.clear_observers();
        self.signals.clear();
    }
}

impl Drop for HubConnection {
    // Drop cannot wait for the pumps; they observe the cancelled token
    // and stop on their own. Call [`close`](Self::close) for teardown
    // that is complete on return.
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }
}

/// Validates and normalizes the configured host.
fn validated_host(config: &HubConfig) -> Result<String, HubError> {
    config
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HubError::Validation("missing [host] setting".into()))
}
