//! Read-only sensors: contact, motion, and leak. All three report battery
//! level when the hardware provides one; none accept writes.

use homelink_protocol::device::AttributeMap;

use crate::accessory::{CharValue, Characteristic, ServiceKind};
use crate::adapter::{AdapterSpec, attr_bool, attr_i64};

const LOW_BATTERY_THRESHOLD: i64 = 20;

pub(crate) static OPEN_CLOSE_SPEC: AdapterSpec = AdapterSpec {
    service: ServiceKind::ContactSensor,
    map_attributes: map_open_close,
    map_write: read_only,
};

pub(crate) static MOTION_SPEC: AdapterSpec = AdapterSpec {
    service: ServiceKind::MotionSensor,
    map_attributes: map_motion,
    map_write: read_only,
};

pub(crate) static LEAK_SPEC: AdapterSpec = AdapterSpec {
    service: ServiceKind::LeakSensor,
    map_attributes: map_leak,
    map_write: read_only,
};

fn read_only(
    _attributes: &AttributeMap,
    _characteristic: Characteristic,
    _value: &CharValue,
) -> Option<AttributeMap> {
    None
}

fn push_battery(attributes: &AttributeMap, out: &mut Vec<(Characteristic, CharValue)>) {
    if let Some(level) = attr_i64(attributes, "batteryPercentage") {
        out.push((Characteristic::BatteryLevel, CharValue::Int(level)));
        out.push((
            Characteristic::StatusLowBattery,
            CharValue::Int(i64::from(level < LOW_BATTERY_THRESHOLD)),
        ));
    }
}

fn map_open_close(attributes: &AttributeMap) -> Vec<(Characteristic, CharValue)> {
    let mut out = Vec::new();
    if let Some(open) = attr_bool(attributes, "isOpen") {
        out.push((Characteristic::ContactState, CharValue::Int(i64::from(open))));
    }
    push_battery(attributes, &mut out);
    out
}

fn map_motion(attributes: &AttributeMap) -> Vec<(Characteristic, CharValue)> {
    let mut out = Vec::new();
    if let Some(detected) = attr_bool(attributes, "isDetected") {
        out.push((Characteristic::MotionDetected, CharValue::Bool(detected)));
    }
    push_battery(attributes, &mut out);
    out
}

fn map_leak(attributes: &AttributeMap) -> Vec<(Characteristic, CharValue)> {
    let mut out = Vec::new();
    if let Some(detected) = attr_bool(attributes, "waterLeakDetected") {
        out.push((Characteristic::LeakDetected, CharValue::Int(i64::from(detected))));
    }
    push_battery(attributes, &mut out);
    out
}
