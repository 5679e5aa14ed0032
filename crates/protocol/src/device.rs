//! Device records as reported by the hub.
//!
//! The hub is authoritative for all of this; local copies are caches that
//! may be partially stale between reconciliation passes.

use serde::{Deserialize, Serialize};

/// Raw device attributes, kept as a JSON map. Per-type adapters pick out
/// the fields they understand; everything else rides along untouched.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// Device type tags known to this bridge.
///
/// `Unknown` absorbs any tag introduced by newer hub firmware so that
/// listing and event parsing never fail on unrecognized types; such
/// devices are skipped downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    Light,
    Blinds,
    OpenCloseSensor,
    MotionSensor,
    Outlet,
    WaterSensor,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceType::Light => "light",
            DeviceType::Blinds => "blinds",
            DeviceType::OpenCloseSensor => "openCloseSensor",
            DeviceType::MotionSensor => "motionSensor",
            DeviceType::Outlet => "outlet",
            DeviceType::WaterSensor => "waterSensor",
            DeviceType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Room assignment of a device, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// One physical or virtual device as the hub reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: String,
    pub device_type: DeviceType,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
}

impl DeviceRecord {
    fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// User-assigned name, if the device has one.
    pub fn custom_name(&self) -> Option<&str> {
        self.attr_str("customName").filter(|s| !s.is_empty())
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.attr_str("serialNumber")
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.attr_str("manufacturer")
    }

    pub fn model(&self) -> Option<&str> {
        self.attr_str("model")
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.attr_str("firmwareVersion")
    }

    /// Room-qualified display name: `"<room> <name>"` when a room is
    /// assigned, the custom name or type tag otherwise.
    pub fn display_name(&self) -> String {
        let name = self
            .custom_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.device_type.to_string());
        match &self.room {
            Some(room) => format!("{} {}", room.name, name),
            None => name,
        }
    }
}
