//! Recipients, parcels and their persistence.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteShipmentStore;
pub use store::{ParcelFilter, ShipmentError, ShipmentStore};
pub use types::*;
