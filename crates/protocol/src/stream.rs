//! Event-stream message types.
//!
//! The envelope defers payload deserialization with `RawValue`, so one
//! malformed or partial frame never fails the whole stream — unparsable
//! payloads are dropped at the dispatch layer.

use serde::{Deserialize, Serialize};

use crate::device::{AttributeMap, DeviceType};

/// Kind tag of a stream message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamEventKind {
    DeviceStateChanged,
    DeviceAdded,
    DeviceRemoved,
    /// Any kind this bridge does not understand.
    #[serde(other)]
    Other,
}

/// Envelope for all inbound stream messages.
#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(default)]
    pub data: Option<Box<serde_json::value::RawValue>>,
}

impl StreamEnvelope {
    /// Deserializes the payload into the given type, if present.
    pub fn parse_data<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.data {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }
}

/// Payload of a `deviceStateChanged` frame. The hub occasionally sends
/// frames without an attribute set; those carry no usable state.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStateChangedData {
    pub id: String,
    #[serde(default)]
    pub attributes: Option<AttributeMap>,
}

/// Payload of a `deviceRemoved` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRemovedData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub device_type: Option<DeviceType>,
}

/// A state change emitted upward — attributes are guaranteed present.
#[derive(Debug, Clone)]
pub struct DeviceStateChange {
    pub id: String,
    pub attributes: AttributeMap,
}

/// A removal emitted upward.
#[derive(Debug, Clone)]
pub struct DeviceRemoval {
    pub device_id: String,
    pub device_type: Option<DeviceType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_state_change() {
        let json = r#"{
            "type": "deviceStateChanged",
            "data": { "id": "dev-1", "attributes": { "isOn": false } }
        }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.kind, StreamEventKind::DeviceStateChanged);
        let data: DeviceStateChangedData = env.parse_data().unwrap().unwrap();
        assert_eq!(data.id, "dev-1");
        assert!(data.attributes.is_some());
    }

    #[test]
    fn envelope_without_data() {
        let json = r#"{ "type": "deviceRemoved" }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        let data: Option<DeviceRemovedData> = env.parse_data().unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn unknown_kind_maps_to_other() {
        let json = r#"{ "type": "sceneUpdated", "data": {} }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.kind, StreamEventKind::Other);
    }

    #[test]
    fn removed_payload_tolerates_missing_fields() {
        let json = r#"{ "type": "deviceRemoved", "data": { "deviceType": "light" } }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        let data: DeviceRemovedData = env.parse_data().unwrap().unwrap();
        assert!(data.id.is_none());
        assert_eq!(data.device_type, Some(DeviceType::Light));
    }
}
