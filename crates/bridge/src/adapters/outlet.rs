//! Smart outlet: a single switchable load.

use homelink_protocol::device::AttributeMap;

use crate::accessory::{CharValue, Characteristic, ServiceKind};
use crate::adapter::{AdapterSpec, attr_bool};

pub(crate) static SPEC: AdapterSpec = AdapterSpec {
    service: ServiceKind::Outlet,
    map_attributes,
    map_write,
};

fn map_attributes(attributes: &AttributeMap) -> Vec<(Characteristic, CharValue)> {
    match attr_bool(attributes, "isOn") {
        Some(on) => vec![(Characteristic::On, CharValue::Bool(on))],
        None => Vec::new(),
    }
}

fn map_write(
    _attributes: &AttributeMap,
    characteristic: Characteristic,
    value: &CharValue,
) -> Option<AttributeMap> {
    match (characteristic, value) {
        (Characteristic::On, CharValue::Bool(on)) => {
            match serde_json::json!({ "isOn": on }) {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            }
        }
        _ => None,
    }
}
