//! Shipment storage trait and types.

use rust_decimal::Decimal;
use thiserror::Error;

use super::{Address, ContactUpdate, NewParcel, Parcel, ParcelStatus, Recipient, RecipientInfo};

/// Error type for shipment storage operations.
#[derive(Debug, Error)]
pub enum ShipmentError {
    #[error("Recipient not found: {0}")]
    RecipientNotFound(i64),

    #[error("Parcel not found: {0}")]
    ParcelNotFound(i64),

    /// The parcel reached a state its owner can no longer change.
    #[error("Parcel {id} is {status}")]
    ParcelFinal { id: i64, status: ParcelStatus },

    #[error("Database error: {0}")]
    Database(String),
}

/// Filter for querying parcels.
#[derive(Debug, Clone, Default)]
pub struct ParcelFilter {
    /// Only parcels sent by this user.
    pub user_id: Option<i64>,
    /// Only parcels in this status.
    pub status: Option<ParcelStatus>,
    /// Only the parcel with this tracking number.
    pub tracking_number: Option<String>,
    /// Maximum number of results. Negative means no limit.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl ParcelFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: ParcelStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Trait for recipient and parcel storage backends.
pub trait ShipmentStore: Send + Sync {
    /// Create a recipient on behalf of `created_by`.
    fn create_recipient(
        &self,
        created_by: i64,
        info: &RecipientInfo,
    ) -> Result<Recipient, ShipmentError>;

    /// Get a recipient by ID.
    fn get_recipient(&self, id: i64) -> Result<Option<Recipient>, ShipmentError>;

    /// Update a recipient's name, email or phone number.
    fn update_recipient_contact(
        &self,
        id: i64,
        update: &ContactUpdate,
    ) -> Result<Recipient, ShipmentError>;

    /// Create a parcel in `Pending` with a fresh tracking number.
    fn create_parcel(&self, parcel: NewParcel) -> Result<Parcel, ShipmentError>;

    /// Get a parcel by ID.
    fn get_parcel(&self, id: i64) -> Result<Option<Parcel>, ShipmentError>;

    /// List parcels matching the filter, newest first.
    fn list_parcels(&self, filter: &ParcelFilter) -> Result<Vec<Parcel>, ShipmentError>;

    /// Count parcels matching the filter (ignores limit and offset).
    fn count_parcels(&self, filter: &ParcelFilter) -> Result<i64, ShipmentError>;

    /// Overwrite a parcel's status.
    fn update_status(&self, id: i64, status: ParcelStatus) -> Result<Parcel, ShipmentError>;

    /// Move the parcel's recipient to `address` and set the parcel's cost,
    /// bumping its destination change counter. Both rows change together or not at all.
    /// Fails with `ParcelFinal` if the parcel is no longer owner-mutable at write time.
    fn reroute(
        &self,
        parcel_id: i64,
        address: &Address,
        cost: Decimal,
    ) -> Result<(Parcel, Recipient), ShipmentError>;

    /// Permanently delete an owner-mutable parcel. Returns the deleted parcel.
    /// Fails with `ParcelFinal` if the parcel is no longer owner-mutable at write time.
    fn delete_parcel(&self, id: i64) -> Result<Parcel, ShipmentError>;
}
