//! Per-hub runtime and the bridge facade.
//!
//! Each configured hub gets its own task and command channel; all engine
//! mutation for a hub happens inside that task, so registry passes and
//! event applications are serialized per hub. Availability travels on a
//! `watch` channel instead: it carries latest-value state, so an edge can
//! never be lost to a full queue, only superseded by a newer one. One hub
//! failing to start never affects the others.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use homelink_hub_client::{HubConfig, HubConnection, HubError};
use homelink_protocol::device::{AttributeMap, DeviceRecord};
use homelink_protocol::stream::DeviceStateChange;

use crate::accessory::{AccessoryHost, AccessoryId, CharValue, Characteristic, UpdateOrigin};
use crate::engine::ReconciliationEngine;

/// Commands a hub task processes in arrival order.
pub(crate) enum HubCommand {
    DeviceAdded(DeviceRecord),
    DeviceRemoved(String),
    StateChanged(DeviceStateChange),
    Write {
        accessory: AccessoryId,
        characteristic: Characteristic,
        value: CharValue,
        origin: UpdateOrigin,
    },
    Identify(AccessoryId),
}

/// What the hub loop needs from a connection.
pub(crate) trait HubPort {
    fn hub_id(&self) -> &str;
    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, HubError>;
    async fn write_attributes(
        &self,
        device_id: &str,
        patch: &AttributeMap,
    ) -> Result<(), HubError>;
    async fn identify(&self, device_id: &str) -> Result<(), HubError>;
}

impl HubPort for HubConnection {
    fn hub_id(&self) -> &str {
        self.id()
    }

    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, HubError> {
        self.list_devices().await
    }

    async fn write_attributes(
        &self,
        device_id: &str,
        patch: &AttributeMap,
    ) -> Result<(), HubError> {
        self.set_device_attributes(device_id, patch).await
    }

    async fn identify(&self, device_id: &str) -> Result<(), HubError> {
        self.identify_device(device_id, None).await
    }
}

/// Drains availability and commands until cancellation or channel close.
/// The watch side dedups here: repeated identical values are no-ops, so
/// only true transitions reach the engine.
pub(crate) async fn run_hub_loop<P: HubPort>(
    port: &P,
    host: &dyn AccessoryHost,
    mut availability_rx: watch::Receiver<bool>,
    mut rx: mpsc::Receiver<HubCommand>,
    cancel: CancellationToken,
) {
    let mut engine = ReconciliationEngine::new(port.hub_id());
    let mut last_available = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = availability_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let available = *availability_rx.borrow_and_update();
                if available != last_available {
                    last_available = available;
                    apply_availability(port, host, &mut engine, available).await;
                }
            }
            command = rx.recv() => {
                let Some(command) = command else { break };
                handle_command(port, host, &mut engine, command).await;
            }
        }
    }
}

async fn apply_availability<P: HubPort>(
    port: &P,
    host: &dyn AccessoryHost,
    engine: &mut ReconciliationEngine,
    available: bool,
) {
    if available {
        match port.fetch_devices().await {
            Ok(devices) => engine.reconcile(&devices, host),
            // stale accessories are better than none; the next
            // availability edge retries the pass
            Err(error) => warn!(hub = %port.hub_id(), %error, "device listing failed"),
        }
    }
    engine.set_all_available(available, host);
}

async fn handle_command<P: HubPort>(
    port: &P,
    host: &dyn AccessoryHost,
    engine: &mut ReconciliationEngine,
    command: HubCommand,
) {
    match command {
        HubCommand::DeviceAdded(device) => engine.apply_added(&device, host),
        HubCommand::DeviceRemoved(device_id) => engine.apply_removed(&device_id, host),
        HubCommand::StateChanged(change) => engine.apply_state_change(&change, host),
        HubCommand::Write {
            accessory,
            characteristic,
            value,
            origin,
        } => {
            let Some((device_id, patch)) =
                engine.resolve_write(accessory, characteristic, &value, origin)
            else {
                return;
            };
            if let Err(error) = port.write_attributes(&device_id, &patch).await {
                error!(hub = %port.hub_id(), device = %device_id, %error, "attribute write failed");
            }
        }
        HubCommand::Identify(accessory) => {
            let Some(device_id) = engine.device_id_for(accessory).map(str::to_string) else {
                return;
            };
            if let Err(error) = port.identify(&device_id).await {
                error!(hub = %port.hub_id(), device = %device_id, %error, "identify failed");
            }
        }
    }
}

struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// The running bridge: one task per configured hub.
pub struct Bridge {
    hubs: Vec<HubHandle>,
}

impl Bridge {
    /// Spawns one runtime per configured hub. Startup failures are logged
    /// per hub; the bridge keeps running with whatever hubs came up.
    pub fn start(configs: Vec<HubConfig>, host: Arc<dyn AccessoryHost>) -> Self {
        let hubs = configs
            .into_iter()
            .map(|config| spawn_hub(config, host.clone()))
            .collect();
        Self { hubs }
    }

    /// Routes a characteristic write to the hub owning the accessory.
    /// Ownership is resolved inside each hub task; non-owners drop it.
    pub async fn set_characteristic(
        &self,
        accessory: AccessoryId,
        characteristic: Characteristic,
        value: CharValue,
        origin: UpdateOrigin,
    ) {
        for hub in &self.hubs {
            let _ = hub
                .tx
                .send(HubCommand::Write {
                    accessory,
                    characteristic,
                    value: value.clone(),
                    origin,
                })
                .await;
        }
    }

    /// Asks the owning device to identify itself.
    pub async fn identify(&self, accessory: AccessoryId) {
        for hub in &self.hubs {
            let _ = hub.tx.send(HubCommand::Identify(accessory)).await;
        }
    }

    /// Stops every hub task and waits for them to finish.
    pub async fn shutdown(self) {
        info!("shutting down bridge");
        for hub in &self.hubs {
            hub.cancel.cancel();
        }
        for hub in self.hubs {
            let _ = hub.task.await;
        }
    }
}

fn spawn_hub(config: HubConfig, host: Arc<dyn AccessoryHost>) -> HubHandle {
    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let forward = tx.clone();
    let cancel_task = cancel.clone();

    let task = tokio::spawn(async move {
        let hub_desc = config.host.clone().unwrap_or_else(|| "<unset>".into());
        let connection = match HubConnection::create(&config).await {
            Ok(connection) => connection,
            Err(error) => {
                error!(hub = %hub_desc, %error, "hub startup failed");
                return;
            }
        };

        let (availability_tx, availability_rx) = watch::channel(false);
        let availability_tx = Arc::new(availability_tx);

        let _subscriptions = [
            {
                let tx = availability_tx.clone();
                connection.on_availability(move |event| {
                    let _ = tx.send(event.available);
                })
            },
            {
                let tx = forward.clone();
                connection.on_device_added(move |device| {
                    if tx.try_send(HubCommand::DeviceAdded(device.clone())).is_err() {
                        warn!("hub command queue full, dropping device addition");
                    }
                })
            },
            {
                let tx = forward.clone();
                connection.on_device_removed(move |removal| {
                    if tx
                        .try_send(HubCommand::DeviceRemoved(removal.device_id.clone()))
                        .is_err()
                    {
                        warn!("hub command queue full, dropping device removal");
                    }
                })
            },
            {
                let tx = forward.clone();
                connection.on_device_state_changed(move |change| {
                    if tx.try_send(HubCommand::StateChanged(change.clone())).is_err() {
                        warn!("hub command queue full, dropping state change");
                    }
                })
            },
        ];

        // an edge may have fired before the subscription existed; seed
        // from current state (the watch keeps only the latest value, so
        // this can race with the subscription without losing anything)
        let _ = availability_tx.send(connection.is_available());

        run_hub_loop(&connection, host.as_ref(), availability_rx, rx, cancel_task).await;
        debug!(hub = %connection.name(), "hub runtime stopped");
        connection.close().await;
    });

    HubHandle { tx, cancel, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use std::sync::Mutex;

    struct MockPort {
        devices: Vec<DeviceRecord>,
        writes: Mutex<Vec<(String, AttributeMap)>>,
        identified: Mutex<Vec<String>>,
    }

    impl MockPort {
        fn with_devices(devices: Vec<DeviceRecord>) -> Self {
            Self {
                devices,
                writes: Mutex::new(Vec::new()),
                identified: Mutex::new(Vec::new()),
            }
        }
    }

    impl HubPort for MockPort {
        fn hub_id(&self) -> &str {
            "mock-hub"
        }

        async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, HubError> {
            Ok(self.devices.clone())
        }

        async fn write_attributes(
            &self,
            device_id: &str,
            patch: &AttributeMap,
        ) -> Result<(), HubError> {
            self.writes
                .lock()
                .unwrap()
                .push((device_id.to_string(), patch.clone()));
            Ok(())
        }

        async fn identify(&self, device_id: &str) -> Result<(), HubError> {
            self.identified.lock().unwrap().push(device_id.to_string());
            Ok(())
        }
    }

    fn light(id: &str, serial: &str) -> DeviceRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "deviceType": "light",
            "attributes": { "serialNumber": serial, "isOn": true }
        }))
        .unwrap()
    }

    /// Marks the hub available, then feeds the commands, closing both
    /// channels so the loop runs to completion.
    async fn drive(port: &MockPort, host: &RecordingHost, commands: Vec<HubCommand>) {
        let mut engine = ReconciliationEngine::new(port.hub_id());
        apply_availability(port, host, &mut engine, true).await;
        for command in commands {
            handle_command(port, host, &mut engine, command).await;
        }
    }

    #[tokio::test]
    async fn availability_edge_triggers_registry_pass() {
        let port = MockPort::with_devices(vec![light("a", "SER-A"), light("b", "SER-B")]);
        let host = RecordingHost::new();
        drive(&port, &host, vec![]).await;
        assert_eq!(host.registered().len(), 2);
    }

    #[tokio::test]
    async fn local_write_reaches_the_owning_device() {
        let device = light("a", "SER-A");
        let accessory = AccessoryId::for_device("mock-hub", &device);
        let port = MockPort::with_devices(vec![device]);
        let host = RecordingHost::new();

        drive(
            &port,
            &host,
            vec![HubCommand::Write {
                accessory,
                characteristic: Characteristic::On,
                value: CharValue::Bool(false),
                origin: UpdateOrigin::Local,
            }],
        )
        .await;

        let writes = port.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "a");
        assert_eq!(writes[0].1["isOn"], serde_json::json!(false));
    }

    #[tokio::test]
    async fn remote_echo_never_writes_back() {
        let device = light("a", "SER-A");
        let accessory = AccessoryId::for_device("mock-hub", &device);
        let port = MockPort::with_devices(vec![device]);
        let host = RecordingHost::new();

        drive(
            &port,
            &host,
            vec![HubCommand::Write {
                accessory,
                characteristic: Characteristic::On,
                value: CharValue::Bool(false),
                origin: UpdateOrigin::Remote,
            }],
        )
        .await;

        assert!(port.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn identify_routes_by_accessory() {
        let device = light("a", "SER-A");
        let accessory = AccessoryId::for_device("mock-hub", &device);
        let port = MockPort::with_devices(vec![device]);
        let host = RecordingHost::new();

        drive(
            &port,
            &host,
            vec![
                HubCommand::Identify(accessory),
                // unknown accessory is dropped, not an error
                HubCommand::Identify(AccessoryId(uuid::Uuid::nil())),
            ],
        )
        .await;

        assert_eq!(*port.identified.lock().unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn unavailability_marks_accessories_inactive() {
        let port = MockPort::with_devices(vec![light("a", "SER-A")]);
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new(port.hub_id());
        apply_availability(&port, &host, &mut engine, true).await;
        apply_availability(&port, &host, &mut engine, false).await;

        let pushes = host.calls();
        let last_active = pushes.iter().rev().find_map(|c| match c {
            crate::testing::HostCall::Update(
                _,
                Characteristic::StatusActive,
                CharValue::Bool(active),
            ) => Some(*active),
            _ => None,
        });
        assert_eq!(last_active, Some(false));
    }

    // The command queue can fill while the hub streams state changes; the
    // availability edge must still get through, or the registry pass for a
    // recovered hub would silently never run.
    #[tokio::test]
    async fn availability_edge_survives_a_full_command_queue() {
        let port = MockPort::with_devices(vec![light("a", "SER-A"), light("b", "SER-B")]);
        let host = RecordingHost::new();

        let (tx, rx) = mpsc::channel(1);
        let change = DeviceStateChange {
            id: "ghost".into(),
            attributes: AttributeMap::new(),
        };
        tx.try_send(HubCommand::StateChanged(change)).unwrap();
        assert!(
            tx.try_send(HubCommand::Identify(AccessoryId(uuid::Uuid::nil())))
                .is_err(),
            "queue is full"
        );

        let (availability_tx, availability_rx) = watch::channel(false);
        availability_tx.send(true).unwrap();
        // the unseen edge is still delivered before the closed watch ends
        // the loop; the command sender stays open so that is the only exit
        drop(availability_tx);

        run_hub_loop(&port, &host, availability_rx, rx, CancellationToken::new()).await;

        assert_eq!(host.registered().len(), 2, "registry pass ran despite full queue");
        drop(tx);
    }

    #[tokio::test]
    async fn repeated_watch_values_do_not_rereconcile() {
        let port = MockPort::with_devices(vec![light("a", "SER-A")]);
        let host = RecordingHost::new();

        let (tx, rx) = mpsc::channel(4);
        let (availability_tx, availability_rx) = watch::channel(false);
        availability_tx.send(true).unwrap();
        availability_tx.send(true).unwrap();
        drop(availability_tx);

        run_hub_loop(&port, &host, availability_rx, rx, CancellationToken::new()).await;
        assert_eq!(host.registered().len(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let port = MockPort::with_devices(vec![]);
        let host = RecordingHost::new();
        let (tx, rx) = mpsc::channel(4);
        let (_availability_tx, availability_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_hub_loop(&port, &host, availability_rx, rx, cancel).await;
        drop(tx);
        assert!(host.calls().is_empty());
    }
}
