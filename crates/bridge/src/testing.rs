//! Shared test double for the platform side.

use std::sync::Mutex;

use crate::accessory::{
    AccessoryDescriptor, AccessoryHost, AccessoryId, CharValue, Characteristic, ServiceKind,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    Register(AccessoryId),
    Unregister(AccessoryId),
    Update(AccessoryId, Characteristic, CharValue),
}

/// Records every host call in order.
pub(crate) struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub(crate) fn registered(&self) -> Vec<AccessoryId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Register(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn unregistered(&self) -> Vec<AccessoryId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Unregister(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn pushes_for(&self, id: AccessoryId) -> Vec<(Characteristic, CharValue)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Update(target, characteristic, value) if target == id => {
                    Some((characteristic, value))
                }
                _ => None,
            })
            .collect()
    }
}

impl AccessoryHost for RecordingHost {
    fn register(&self, descriptor: &AccessoryDescriptor) {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::Register(descriptor.id));
    }

    fn unregister(&self, id: &AccessoryId) {
        self.calls.lock().unwrap().push(HostCall::Unregister(*id));
    }

    fn update_characteristic(
        &self,
        id: &AccessoryId,
        _service: ServiceKind,
        characteristic: Characteristic,
        value: &CharValue,
    ) {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::Update(*id, characteristic, value.clone()));
    }
}
