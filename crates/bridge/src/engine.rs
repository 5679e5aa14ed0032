//! Reconciliation between the hub's device registry and the published
//! accessory set.
//!
//! A full pass runs whenever the hub becomes available (startup included):
//! stale accessories are retired first, then survivors are refreshed and
//! newcomers published. Push events take the cheap paths instead; they
//! never trigger a full pass.

use homelink_protocol::device::{AttributeMap, DeviceRecord};
use homelink_protocol::stream::DeviceStateChange;
use tracing::{debug, info};

use crate::accessory::{AccessoryHost, AccessoryId, CharValue, Characteristic, UpdateOrigin};
use crate::adapter::{DeviceAdapter, adapter_for};

pub struct ReconciliationEngine {
    hub_id: String,
    known: Vec<DeviceAdapter>,
}

impl ReconciliationEngine {
    pub fn new(hub_id: impl Into<String>) -> Self {
        Self {
            hub_id: hub_id.into(),
            known: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Full diff against a fresh registry listing. Removals strictly
    /// precede additions so a device that changed identity frees its
    /// accessory slot before the replacement claims one.
    pub fn reconcile(&mut self, fresh: &[DeviceRecord], host: &dyn AccessoryHost) {
        let supported: Vec<&DeviceRecord> = fresh
            .iter()
            .filter(|d| adapter_for(d.device_type).is_some())
            .collect();
        let fresh_ids: Vec<AccessoryId> = supported
            .iter()
            .map(|d| AccessoryId::for_device(&self.hub_id, d))
            .collect();

        let mut removed = 0;
        self.known.retain(|adapter| {
            let keep = fresh_ids.contains(&adapter.accessory_id());
            if !keep {
                debug!(device = %adapter.device_id(), "retiring vanished device");
                host.unregister(&adapter.accessory_id());
                removed += 1;
            }
            keep
        });

        let mut added = 0;
        for device in supported {
            let accessory_id = AccessoryId::for_device(&self.hub_id, device);
            match self.find_mut(accessory_id) {
                Some(adapter) => adapter.refresh(device, host),
                None => {
                    if let Some(adapter) = DeviceAdapter::register(&self.hub_id, device, host) {
                        self.known.push(adapter);
                        added += 1;
                    }
                }
            }
        }

        info!(
            hub = %self.hub_id,
            devices = self.known.len(),
            added,
            removed,
            "reconciled device registry"
        );
    }

    /// Cheap path for a device-added event. A known device is refreshed in
    /// place; the hub occasionally re-announces existing devices.
    pub fn apply_added(&mut self, device: &DeviceRecord, host: &dyn AccessoryHost) {
        let Some(_) = adapter_for(device.device_type) else {
            debug!(device = %device.id, kind = %device.device_type, "ignoring unsupported device");
            return;
        };
        let accessory_id = AccessoryId::for_device(&self.hub_id, device);
        match self.find_mut(accessory_id) {
            Some(adapter) => adapter.refresh(device, host),
            None => {
                if let Some(adapter) = DeviceAdapter::register(&self.hub_id, device, host) {
                    self.known.push(adapter);
                }
            }
        }
    }

    /// Cheap path for a device-removed event. Unknown ids are ignored.
    pub fn apply_removed(&mut self, device_id: &str, host: &dyn AccessoryHost) {
        if let Some(index) = self.known.iter().position(|a| a.device_id() == device_id) {
            // keep insertion order for the survivors
            let adapter = self.known.remove(index);
            debug!(device = %device_id, "retiring removed device");
            host.unregister(&adapter.accessory_id());
        }
    }

    /// Cheap path for a state-change event. Changes for devices this
    /// engine does not track are dropped.
    pub fn apply_state_change(&mut self, change: &DeviceStateChange, host: &dyn AccessoryHost) {
        if let Some(adapter) = self.known.iter_mut().find(|a| a.device_id() == change.id) {
            adapter.apply_attributes(&change.attributes, host);
        }
    }

    /// Pushes reachability to every accessory. Fired on availability
    /// edges only; the flag upstream is edge-triggered.
    pub fn set_all_available(&self, available: bool, host: &dyn AccessoryHost) {
        for adapter in &self.known {
            adapter.set_available(available, host);
        }
    }

    /// Resolves a local characteristic write to `(device id, attribute
    /// patch)`. `None` when the accessory is unknown here, the
    /// characteristic is not writable, or the origin is `Remote`.
    pub fn resolve_write(
        &self,
        accessory_id: AccessoryId,
        characteristic: Characteristic,
        value: &CharValue,
        origin: UpdateOrigin,
    ) -> Option<(String, AttributeMap)> {
        let adapter = self.known.iter().find(|a| a.accessory_id() == accessory_id)?;
        let patch = adapter.write_request(characteristic, value, origin)?;
        Some((adapter.device_id().to_string(), patch))
    }

    /// Device owning the given accessory, if tracked here.
    pub fn device_id_for(&self, accessory_id: AccessoryId) -> Option<&str> {
        self.known
            .iter()
            .find(|a| a.accessory_id() == accessory_id)
            .map(DeviceAdapter::device_id)
    }

    fn find_mut(&mut self, accessory_id: AccessoryId) -> Option<&mut DeviceAdapter> {
        self.known
            .iter_mut()
            .find(|a| a.accessory_id() == accessory_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{HostCall, RecordingHost};

    fn device(id: &str, kind: &str, serial: &str) -> DeviceRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "deviceType": kind,
            "attributes": { "serialNumber": serial, "isOn": true }
        }))
        .unwrap()
    }

    #[test]
    fn startup_pass_publishes_every_supported_device() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(
            &[device("a", "light", "SER-A"), device("b", "outlet", "SER-B")],
            &host,
        );
        assert_eq!(engine.len(), 2);
        assert_eq!(host.registered().len(), 2);
        assert!(host.unregistered().is_empty());
    }

    #[test]
    fn unsupported_devices_are_skipped() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(
            &[device("a", "light", "SER-A"), device("x", "airPurifier", "SER-X")],
            &host,
        );
        assert_eq!(engine.len(), 1);
        assert_eq!(host.registered().len(), 1);
    }

    #[test]
    fn removals_precede_additions() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(&[device("a", "light", "SER-A")], &host);
        host.clear();

        engine.reconcile(&[device("b", "light", "SER-B")], &host);

        let order: Vec<HostCall> = host
            .calls()
            .into_iter()
            .filter(|c| matches!(c, HostCall::Register(_) | HostCall::Unregister(_)))
            .collect();
        assert_eq!(order.len(), 2);
        assert!(matches!(order[0], HostCall::Unregister(_)));
        assert!(matches!(order[1], HostCall::Register(_)));
    }

    #[test]
    fn survivor_is_refreshed_not_reregistered() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(&[device("a", "light", "SER-A")], &host);
        let accessory = host.registered()[0];
        host.clear();

        // same physical device, fresh attribute state
        let mut updated = device("a", "light", "SER-A");
        updated
            .attributes
            .insert("isOn".into(), serde_json::json!(false));
        engine.reconcile(&[updated], &host);

        assert!(host.registered().is_empty());
        assert!(host.unregistered().is_empty());
        assert!(
            host.pushes_for(accessory)
                .contains(&(Characteristic::On, CharValue::Bool(false)))
        );
    }

    #[test]
    fn added_event_registers_and_reannouncement_refreshes() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");

        engine.apply_added(&device("a", "light", "SER-A"), &host);
        assert_eq!(engine.len(), 1);
        assert_eq!(host.registered().len(), 1);

        // the hub re-announces the same device
        engine.apply_added(&device("a", "light", "SER-A"), &host);
        assert_eq!(engine.len(), 1);
        assert_eq!(host.registered().len(), 1, "no duplicate registration");
    }

    #[test]
    fn removed_event_retires_exactly_that_device() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(
            &[device("a", "light", "SER-A"), device("b", "outlet", "SER-B")],
            &host,
        );
        host.clear();

        engine.apply_removed("a", &host);
        assert_eq!(engine.len(), 1);
        assert_eq!(host.unregistered().len(), 1);

        // unknown id is a no-op
        engine.apply_removed("zzz", &host);
        assert_eq!(engine.len(), 1);
        assert_eq!(host.unregistered().len(), 1);
    }

    #[test]
    fn removal_keeps_survivor_order_stable() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(
            &[
                device("a", "light", "SER-A"),
                device("b", "outlet", "SER-B"),
                device("c", "light", "SER-C"),
            ],
            &host,
        );
        let order = host.registered();
        host.clear();

        engine.apply_removed("b", &host);
        engine.set_all_available(false, &host);

        let fanned_out: Vec<_> = host
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Update(id, Characteristic::StatusActive, _) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(fanned_out, vec![order[0], order[2]]);
    }

    #[test]
    fn state_change_for_untracked_device_is_dropped() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(&[device("a", "light", "SER-A")], &host);
        host.clear();

        let change = DeviceStateChange {
            id: "ghost".into(),
            attributes: serde_json::from_value(serde_json::json!({ "isOn": false })).unwrap(),
        };
        engine.apply_state_change(&change, &host);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn availability_fans_out_to_all_accessories() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(
            &[device("a", "light", "SER-A"), device("b", "outlet", "SER-B")],
            &host,
        );
        host.clear();

        engine.set_all_available(false, &host);
        let updates: Vec<_> = host
            .calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    HostCall::Update(_, Characteristic::StatusActive, CharValue::Bool(false))
                )
            })
            .collect();
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn resolve_write_routes_to_owning_device() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");
        engine.reconcile(&[device("a", "light", "SER-A")], &host);
        let accessory = host.registered()[0];

        let (device_id, patch) = engine
            .resolve_write(
                accessory,
                Characteristic::On,
                &CharValue::Bool(false),
                UpdateOrigin::Local,
            )
            .unwrap();
        assert_eq!(device_id, "a");
        assert_eq!(patch["isOn"], serde_json::json!(false));

        assert!(
            engine
                .resolve_write(
                    accessory,
                    Characteristic::On,
                    &CharValue::Bool(false),
                    UpdateOrigin::Remote,
                )
                .is_none()
        );
    }

    // Outage and recovery as one sequence: devices appear, one is removed
    // mid-flight, the hub drops, then comes back with a changed registry.
    #[test]
    fn outage_recovery_reconverges_with_minimal_churn() {
        let host = RecordingHost::new();
        let mut engine = ReconciliationEngine::new("hub-1");

        engine.reconcile(
            &[device("a", "light", "SER-A"), device("b", "outlet", "SER-B")],
            &host,
        );
        assert_eq!(host.registered().len(), 2);

        engine.apply_removed("a", &host);
        engine.set_all_available(false, &host);
        host.clear();

        // hub back, now with B and a new C
        engine.set_all_available(true, &host);
        engine.reconcile(
            &[device("b", "outlet", "SER-B"), device("c", "light", "SER-C")],
            &host,
        );

        assert_eq!(host.registered().len(), 1, "only C is new");
        assert!(host.unregistered().is_empty());
        assert_eq!(engine.len(), 2);
    }
}
