//! Device-to-accessory adapters.
//!
//! One [`AdapterSpec`] per supported device type, held in a static table.
//! A spec is a pair of pure functions over the device's attribute map:
//! `map_attributes` projects hub state onto characteristics, `map_write`
//! turns a characteristic write into the attribute patch to send back.
//! Capability differences between device types live entirely in these
//! tables; the engine and runtime are type-agnostic.

use homelink_protocol::device::{AttributeMap, DeviceRecord, DeviceType};
use tracing::debug;

use crate::accessory::{
    AccessoryDescriptor, AccessoryHost, AccessoryId, CharValue, Characteristic, ServiceKind,
    UpdateOrigin,
};
use crate::adapters;

/// Capability table entry for one device type.
pub struct AdapterSpec {
    pub service: ServiceKind,
    /// Projects current attributes onto characteristic values. Attributes
    /// the device does not report are simply absent from the result.
    pub map_attributes: fn(&AttributeMap) -> Vec<(Characteristic, CharValue)>,
    /// Builds the attribute patch for a characteristic write. `None` when
    /// the characteristic is not writable on this device type.
    pub map_write: fn(&AttributeMap, Characteristic, &CharValue) -> Option<AttributeMap>,
}

/// Looks up the capability table. `None` for device types the bridge does
/// not expose; callers skip those devices silently.
pub fn adapter_for(device_type: DeviceType) -> Option<&'static AdapterSpec> {
    match device_type {
        DeviceType::Light => Some(&adapters::light::SPEC),
        DeviceType::Blinds => Some(&adapters::blinds::SPEC),
        DeviceType::Outlet => Some(&adapters::outlet::SPEC),
        DeviceType::OpenCloseSensor => Some(&adapters::sensors::OPEN_CLOSE_SPEC),
        DeviceType::MotionSensor => Some(&adapters::sensors::MOTION_SPEC),
        DeviceType::WaterSensor => Some(&adapters::sensors::LEAK_SPEC),
        DeviceType::Unknown => None,
    }
}

/// A registered device: its accessory identity, its capability table
/// entry, and the last attribute state seen from the hub.
pub struct DeviceAdapter {
    accessory_id: AccessoryId,
    device_id: String,
    spec: &'static AdapterSpec,
    attributes: AttributeMap,
}

impl DeviceAdapter {
    /// Builds an adapter and publishes the accessory, pushing the initial
    /// characteristic state. `None` for unsupported device types.
    pub fn register(
        hub_id: &str,
        device: &DeviceRecord,
        host: &dyn AccessoryHost,
    ) -> Option<Self> {
        let Some(spec) = adapter_for(device.device_type) else {
            debug!(device = %device.id, kind = %device.device_type, "unsupported device type, skipping");
            return None;
        };

        let accessory_id = AccessoryId::for_device(hub_id, device);
        host.register(&AccessoryDescriptor {
            id: accessory_id,
            name: device.display_name(),
            service: spec.service,
            manufacturer: device.manufacturer().map(str::to_string),
            model: device.model().map(str::to_string),
            serial_number: device.serial_number().map(str::to_string),
            firmware_version: device.firmware_version().map(str::to_string),
        });

        let adapter = Self {
            accessory_id,
            device_id: device.id.clone(),
            spec,
            attributes: device.attributes.clone(),
        };
        adapter.push_all(host);
        Some(adapter)
    }

    pub fn accessory_id(&self) -> AccessoryId {
        self.accessory_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Merges a partial attribute update into the cached state and pushes
    /// the resulting characteristic values.
    pub fn apply_attributes(&mut self, update: &AttributeMap, host: &dyn AccessoryHost) {
        for (key, value) in update {
            self.attributes.insert(key.clone(), value.clone());
        }
        self.push_all(host);
    }

    /// Refreshes from a full device record (registry fetch), replacing the
    /// cached attributes outright.
    pub fn refresh(&mut self, device: &DeviceRecord, host: &dyn AccessoryHost) {
        self.device_id = device.id.clone();
        self.attributes = device.attributes.clone();
        self.push_all(host);
    }

    pub fn set_available(&self, available: bool, host: &dyn AccessoryHost) {
        host.update_characteristic(
            &self.accessory_id,
            self.spec.service,
            Characteristic::StatusActive,
            &CharValue::Bool(available),
        );
    }

    /// Resolves a characteristic write to the attribute patch to send.
    /// `Remote`-origin writes are state mirrors and never produce a patch.
    pub fn write_request(
        &self,
        characteristic: Characteristic,
        value: &CharValue,
        origin: UpdateOrigin,
    ) -> Option<AttributeMap> {
        match origin {
            UpdateOrigin::Remote => None,
            UpdateOrigin::Local => (self.spec.map_write)(&self.attributes, characteristic, value),
        }
    }

    fn push_all(&self, host: &dyn AccessoryHost) {
        for (characteristic, value) in (self.spec.map_attributes)(&self.attributes) {
            host.update_characteristic(&self.accessory_id, self.spec.service, characteristic, &value);
        }
    }
}

// Attribute extraction helpers shared by the per-type tables.

pub(crate) fn attr_bool(attributes: &AttributeMap, key: &str) -> Option<bool> {
    attributes.get(key).and_then(serde_json::Value::as_bool)
}

pub(crate) fn attr_i64(attributes: &AttributeMap, key: &str) -> Option<i64> {
    attributes.get(key).and_then(serde_json::Value::as_i64)
}

pub(crate) fn attr_f64(attributes: &AttributeMap, key: &str) -> Option<f64> {
    attributes.get(key).and_then(serde_json::Value::as_f64)
}
