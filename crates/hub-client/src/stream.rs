//! Event-stream pump — consumes the hub's push feed.
//!
//! Exactly one subscription per connection lifetime. Malformed or partial
//! frames are dropped at this layer (logged at debug, never surfaced):
//! the transport occasionally delivers incomplete frames, and failing the
//! connection on one bad frame would be disproportionate.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use homelink_protocol::constants::API_PORT;
use homelink_protocol::device::DeviceRecord;
use homelink_protocol::stream::{
    DeviceRemoval, DeviceRemovedData, DeviceStateChange, DeviceStateChangedData, StreamEnvelope,
    StreamEventKind,
};

use crate::availability::Availability;
use crate::error::HubError;
use crate::signal::Signal;

/// Per-connection device event signals.
pub(crate) struct HubSignals {
    pub(crate) device_state_changed: Signal<DeviceStateChange>,
    pub(crate) device_added: Signal<DeviceRecord>,
    pub(crate) device_removed: Signal<DeviceRemoval>,
}

impl HubSignals {
    pub(crate) fn new() -> Self {
        Self {
            device_state_changed: Signal::new(),
            device_added: Signal::new(),
            device_removed: Signal::new(),
        }
    }

    pub(crate) fn clear(&self) {
        self.device_state_changed.clear();
        self.device_added.clear();
        self.device_removed.clear();
    }
}

/// Opens the push-event subscription (`wss://{host}/v1`, bearer auth).
/// Hubs use self-signed certificates, so acceptance is configured on this
/// one connector, never globally.
pub(crate) async fn connect_stream(
    host: &str,
    token: &str,
    accept_invalid_certs: bool,
) -> Result<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    HubError,
> {
    let url = format!("wss://{host}:{API_PORT}/v1");
    let mut request = url.into_client_request()?;
    let bearer = format!("Bearer {token}")
        .parse()
        .map_err(|e| HubError::Connection(format!("invalid token header: {e}")))?;
    request
        .headers_mut()
        .insert(tungstenite::http::header::AUTHORIZATION, bearer);

    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_certs)
        .build()
        .map_err(|e| HubError::Connection(format!("TLS setup failed: {e}")))?;

    let (ws, _) = tokio_tungstenite::connect_async_tls_with_config(
        request,
        None,
        false,
        Some(tokio_tungstenite::Connector::NativeTls(connector)),
    )
    .await?;
    Ok(ws)
}

/// Reads the subscription until cancellation or transport loss.
///
/// Every inbound text frame first signals liveness (resetting the
/// heartbeat), then is dispatched. A transport error or close flips
/// availability; the next successful probe recovers it. There is no
/// resubscription.
pub(crate) async fn stream_pump<S>(
    mut ws: S,
    signals: Arc<HubSignals>,
    availability: Arc<Availability>,
    liveness_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>>
        + Sink<tungstenite::Message, Error = tungstenite::Error>
        + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = ws.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let _ = liveness_tx.try_send(());
                        dispatch_frame(&text, &signals);
                    }
                    Some(Ok(tungstenite::Message::Ping(data))) => {
                        let _ = ws.send(tungstenite::Message::Pong(data)).await;
                    }
                    Some(Ok(tungstenite::Message::Close(_))) => {
                        debug!("event stream closed by hub");
                        availability.set_available(false, Some("event stream closed".into()));
                        break;
                    }
                    Some(Ok(_)) => {} // Pong / Binary — ignore
                    Some(Err(error)) => {
                        warn!(%error, "event stream error");
                        availability.set_available(false, Some(error.to_string()));
                        break;
                    }
                    None => {
                        debug!("event stream ended");
                        availability.set_available(false, Some("event stream ended".into()));
                        break;
                    }
                }
            }
        }
    }
}

/// Parses one frame and emits the matching signal. Frames with a missing
/// id or attribute payload carry nothing actionable and are dropped.
pub(crate) fn dispatch_frame(text: &str, signals: &HubSignals) {
    let envelope: StreamEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            debug!(%error, "dropping malformed stream frame");
            return;
        }
    };

    match envelope.kind {
        StreamEventKind::DeviceStateChanged => match envelope.parse_data::<DeviceStateChangedData>()
        {
            Ok(Some(DeviceStateChangedData {
                id,
                attributes: Some(attributes),
            })) => {
                trace!(device = %id, "device state changed");
                signals
                    .device_state_changed
                    .emit(&DeviceStateChange { id, attributes });
            }
            Ok(_) => debug!("state change without attributes, dropping"),
            Err(error) => debug!(%error, "dropping malformed state change"),
        },

        StreamEventKind::DeviceAdded => match envelope.parse_data::<DeviceRecord>() {
            Ok(Some(device)) => {
                trace!(device = %device.id, "device added");
                signals.device_added.emit(&device);
            }
            Ok(None) => debug!("device added without payload, dropping"),
            Err(error) => debug!(%error, "dropping malformed device addition"),
        },

        StreamEventKind::DeviceRemoved => match envelope.parse_data::<DeviceRemovedData>() {
            Ok(Some(DeviceRemovedData {
                id: Some(id),
                device_type,
            })) => {
                trace!(device = %id, "device removed");
                signals.device_removed.emit(&DeviceRemoval {
                    device_id: id,
                    device_type,
                });
            }
            Ok(_) => debug!("device removal without id, dropping"),
            Err(error) => debug!(%error, "dropping malformed device removal"),
        },

        StreamEventKind::Other => trace!("ignoring unrecognized stream frame"),
    }
}
