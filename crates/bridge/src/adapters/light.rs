//! Lightbulb: on/off, dimming, color, and color temperature.
//!
//! The hub reports color temperature in Kelvin within a per-bulb
//! `[colorTemperatureMin, colorTemperatureMax]` range; the accessory side
//! works in mireds over the fixed 140..=500 range. The two scales run in
//! opposite directions (higher Kelvin is cooler, higher mireds is warmer),
//! so the mapping inverts as it rescales.

use homelink_protocol::device::AttributeMap;

use crate::accessory::{CharValue, Characteristic, ServiceKind};
use crate::adapter::{AdapterSpec, attr_bool, attr_f64, attr_i64};

const MIRED_MIN: f64 = 140.0;
const MIRED_MAX: f64 = 500.0;

// Fallback Kelvin range for bulbs that report a temperature without
// advertising their range.
const DEFAULT_KELVIN_MIN: f64 = 2202.0;
const DEFAULT_KELVIN_MAX: f64 = 4000.0;

pub(crate) static SPEC: AdapterSpec = AdapterSpec {
    service: ServiceKind::Lightbulb,
    map_attributes,
    map_write,
};

fn kelvin_range(attributes: &AttributeMap) -> (f64, f64) {
    let min = attr_f64(attributes, "colorTemperatureMin").unwrap_or(DEFAULT_KELVIN_MIN);
    let max = attr_f64(attributes, "colorTemperatureMax").unwrap_or(DEFAULT_KELVIN_MAX);
    if max > min { (min, max) } else { (DEFAULT_KELVIN_MIN, DEFAULT_KELVIN_MAX) }
}

fn kelvin_to_mireds(attributes: &AttributeMap, kelvin: f64) -> i64 {
    let (min, max) = kelvin_range(attributes);
    let fraction = ((max - kelvin) / (max - min)).clamp(0.0, 1.0);
    (MIRED_MIN + fraction * (MIRED_MAX - MIRED_MIN)).round() as i64
}

fn mireds_to_kelvin(attributes: &AttributeMap, mireds: f64) -> i64 {
    let (min, max) = kelvin_range(attributes);
    let fraction = ((mireds - MIRED_MIN) / (MIRED_MAX - MIRED_MIN)).clamp(0.0, 1.0);
    (max - fraction * (max - min)).round() as i64
}

fn map_attributes(attributes: &AttributeMap) -> Vec<(Characteristic, CharValue)> {
    let mut out = Vec::new();
    if let Some(on) = attr_bool(attributes, "isOn") {
        out.push((Characteristic::On, CharValue::Bool(on)));
    }
    if let Some(level) = attr_i64(attributes, "lightLevel") {
        out.push((Characteristic::Brightness, CharValue::Int(level)));
    }
    if let Some(hue) = attr_f64(attributes, "colorHue") {
        out.push((Characteristic::Hue, CharValue::Float(hue)));
    }
    if let Some(saturation) = attr_f64(attributes, "colorSaturation") {
        // hub scale is 0..=1, accessory scale is percent
        out.push((Characteristic::Saturation, CharValue::Float(saturation * 100.0)));
    }
    if let Some(kelvin) = attr_f64(attributes, "colorTemperature") {
        out.push((
            Characteristic::ColorTemperature,
            CharValue::Int(kelvin_to_mireds(attributes, kelvin)),
        ));
    }
    out
}

fn map_write(
    attributes: &AttributeMap,
    characteristic: Characteristic,
    value: &CharValue,
) -> Option<AttributeMap> {
    let patch = match (characteristic, value) {
        (Characteristic::On, CharValue::Bool(on)) => serde_json::json!({ "isOn": on }),
        (Characteristic::Brightness, CharValue::Int(level)) => {
            serde_json::json!({ "lightLevel": (*level).clamp(1, 100) })
        }
        (Characteristic::Hue, CharValue::Float(hue)) => serde_json::json!({ "colorHue": hue }),
        (Characteristic::Saturation, CharValue::Float(saturation)) => {
            serde_json::json!({ "colorSaturation": saturation / 100.0 })
        }
        (Characteristic::ColorTemperature, CharValue::Int(mireds)) => {
            serde_json::json!({ "colorTemperature": mireds_to_kelvin(attributes, *mireds as f64) })
        }
        _ => return None,
    };
    match patch {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}
