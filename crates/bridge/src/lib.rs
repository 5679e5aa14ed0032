//! Bridges hub devices onto a home-automation accessory platform.
//!
//! The platform implements [`AccessoryHost`]; the bridge owns the hub
//! connections and keeps the published accessory set converged with each
//! hub's device registry.

pub mod accessory;
pub mod adapter;
pub mod engine;
pub mod runtime;

pub(crate) mod adapters;

#[cfg(test)]
pub(crate) mod testing;

pub use accessory::{
    AccessoryDescriptor, AccessoryHost, AccessoryId, CharValue, Characteristic, ServiceKind,
    UpdateOrigin,
};
pub use engine::ReconciliationEngine;
pub use runtime::Bridge;
