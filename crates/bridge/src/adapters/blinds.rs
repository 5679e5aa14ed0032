//! Window covering. The hub counts percent closed (0 = fully open), the
//! accessory side counts percent open (100 = fully open), so both
//! directions flip the scale.

use homelink_protocol::device::AttributeMap;

use crate::accessory::{CharValue, Characteristic, ServiceKind};
use crate::adapter::{AdapterSpec, attr_i64};

pub(crate) static SPEC: AdapterSpec = AdapterSpec {
    service: ServiceKind::WindowCovering,
    map_attributes,
    map_write,
};

fn map_attributes(attributes: &AttributeMap) -> Vec<(Characteristic, CharValue)> {
    let mut out = Vec::new();
    if let Some(level) = attr_i64(attributes, "blindsCurrentLevel") {
        out.push((
            Characteristic::CurrentPosition,
            CharValue::Int(100 - level.clamp(0, 100)),
        ));
    }
    if let Some(level) = attr_i64(attributes, "blindsTargetLevel") {
        out.push((
            Characteristic::TargetPosition,
            CharValue::Int(100 - level.clamp(0, 100)),
        ));
    }
    out
}

fn map_write(
    _attributes: &AttributeMap,
    characteristic: Characteristic,
    value: &CharValue,
) -> Option<AttributeMap> {
    match (characteristic, value) {
        (Characteristic::TargetPosition, CharValue::Int(position)) => {
            let patch = serde_json::json!({ "blindsTargetLevel": 100 - (*position).clamp(0, 100) });
            match patch {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(value: serde_json::Value) -> AttributeMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn positions_are_inverted() {
        let mapped = map_attributes(&attrs(serde_json::json!({
            "blindsCurrentLevel": 30,
            "blindsTargetLevel": 100
        })));
        assert!(mapped.contains(&(Characteristic::CurrentPosition, CharValue::Int(70))));
        assert!(mapped.contains(&(Characteristic::TargetPosition, CharValue::Int(0))));
    }

    #[test]
    fn target_write_inverts_back() {
        let patch = map_write(
            &AttributeMap::new(),
            Characteristic::TargetPosition,
            &CharValue::Int(70),
        )
        .unwrap();
        assert_eq!(patch["blindsTargetLevel"], serde_json::json!(30));
    }

    #[test]
    fn current_position_is_read_only() {
        assert!(
            map_write(
                &AttributeMap::new(),
                Characteristic::CurrentPosition,
                &CharValue::Int(50)
            )
            .is_none()
        );
    }
}
