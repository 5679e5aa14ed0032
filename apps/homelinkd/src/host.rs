//! Logging accessory host.
//!
//! The daemon has no accessory platform attached; it traces every
//! registration and characteristic push instead, which is what you want
//! when validating hub connectivity and device mapping.

use homelink_bridge::{
    AccessoryDescriptor, AccessoryHost, AccessoryId, CharValue, Characteristic, ServiceKind,
};
use tracing::info;

pub struct LoggingAccessoryHost;

impl AccessoryHost for LoggingAccessoryHost {
    fn register(&self, descriptor: &AccessoryDescriptor) {
        info!(
            accessory = %descriptor.id,
            name = %descriptor.name,
            service = ?descriptor.service,
            model = descriptor.model.as_deref().unwrap_or("-"),
            "accessory registered"
        );
    }

    fn unregister(&self, id: &AccessoryId) {
        info!(accessory = %id, "accessory unregistered");
    }

    fn update_characteristic(
        &self,
        id: &AccessoryId,
        _service: ServiceKind,
        characteristic: Characteristic,
        value: &CharValue,
    ) {
        info!(accessory = %id, characteristic = ?characteristic, value = ?value, "characteristic updated");
    }
}
