//! HTTP surface of the SendIT parcel service.

pub mod api;
pub mod metrics;
pub mod state;
