//! Accessory-side vocabulary: identifiers, services, characteristics, and
//! the host trait the platform implements.

use std::fmt;

use homelink_protocol::device::DeviceRecord;

/// Namespace for deterministic accessory identifiers. Fixed so that the
/// same device on the same hub maps to the same accessory across restarts.
const ACCESSORY_NAMESPACE: uuid::Uuid = uuid::Uuid::from_bytes([
    0x6f, 0x1c, 0x2a, 0x84, 0x9b, 0x3d, 0x4e, 0x51, 0x8a, 0x07, 0xc5, 0x2e, 0x96, 0xd4, 0x1b, 0x38,
]);

/// Stable accessory identifier derived from hub id, device type, and the
/// device's serial number (falling back to its hub-assigned id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessoryId(pub uuid::Uuid);

impl AccessoryId {
    pub fn for_device(hub_id: &str, device: &DeviceRecord) -> Self {
        let serial = device.serial_number().unwrap_or(&device.id);
        let seed = format!("{hub_id}:{}:{serial}", device.device_type);
        Self(uuid::Uuid::new_v5(&ACCESSORY_NAMESPACE, seed.as_bytes()))
    }
}

impl fmt::Display for AccessoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Service the accessory exposes. One service per accessory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Lightbulb,
    WindowCovering,
    Outlet,
    ContactSensor,
    MotionSensor,
    LeakSensor,
}

/// Characteristics surfaced across the supported services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    On,
    Brightness,
    Hue,
    Saturation,
    ColorTemperature,
    CurrentPosition,
    TargetPosition,
    ContactState,
    MotionDetected,
    LeakDetected,
    BatteryLevel,
    StatusLowBattery,
    StatusActive,
}

/// Characteristic payload.
#[derive(Debug, Clone, PartialEq)]
pub enum CharValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Where a characteristic update originated.
///
/// `Remote` updates mirror hub state into the accessory and must never be
/// written back, or every push event would echo a redundant write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// A user acted on the accessory; propagate to the hub.
    Local,
    /// The hub reported a change; display only.
    Remote,
}

/// Everything the platform needs to publish an accessory.
#[derive(Debug, Clone)]
pub struct AccessoryDescriptor {
    pub id: AccessoryId,
    pub name: String,
    pub service: ServiceKind,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
}

/// Platform side of the bridge. Implementations publish accessories and
/// receive characteristic pushes; all calls are synchronous and must not
/// block.
pub trait AccessoryHost: Send + Sync {
    fn register(&self, descriptor: &AccessoryDescriptor);
    fn unregister(&self, id: &AccessoryId);
    fn update_characteristic(
        &self,
        id: &AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
        value: &CharValue,
    );
}
