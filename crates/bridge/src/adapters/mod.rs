//! Per-device-type capability tables.

pub(crate) mod blinds;
pub(crate) mod light;
pub(crate) mod outlet;
pub(crate) mod sensors;
