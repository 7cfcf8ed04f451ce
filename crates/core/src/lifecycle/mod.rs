//! Order lifecycle: creating orders, tracking status, cancellation and re-routing.
//!
//! A parcel moves `Pending -> Accepted -> Out For Delivery -> Delivered`.
//! Owners may cancel or re-route it until it is delivered; admins set its
//! status. Every mutation is logged, counted and audited.

mod manager;
mod types;

pub use manager::OrderManager;
pub use types::*;

use thiserror::Error;

use crate::account::UserStoreError;
use crate::quote::QuoteError;
use crate::shipment::ShipmentError;
use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(String),

    #[error("Invalid transition for parcel {parcel_id}: {reason}")]
    InvalidTransition { parcel_id: i64, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Admin role required")]
    Forbidden,

    #[error("Service unreachable: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OrderError {
    pub(crate) fn parcel_not_found(id: i64) -> Self {
        Self::NotFound { kind: "Parcel", id }
    }

    pub(crate) fn recipient_not_found(id: i64) -> Self {
        Self::NotFound {
            kind: "Recipient",
            id,
        }
    }
}

impl From<ShipmentError> for OrderError {
    fn from(err: ShipmentError) -> Self {
        match err {
            ShipmentError::ParcelNotFound(id) => Self::parcel_not_found(id),
            ShipmentError::RecipientNotFound(id) => Self::recipient_not_found(id),
            ShipmentError::ParcelFinal { id, status } => Self::InvalidTransition {
                parcel_id: id,
                reason: format!("parcel is {}", status),
            },
            ShipmentError::Database(msg) => Self::Storage(msg),
        }
    }
}

impl From<UserStoreError> for OrderError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::UserNotFound(id) => Self::NotFound { kind: "User", id },
            UserStoreError::EmailTaken(email) => Self::Validation(FieldErrors::single(
                "email",
                format!("{} is already in use", email),
            )),
            UserStoreError::Database(msg) => Self::Storage(msg),
        }
    }
}

impl From<QuoteError> for OrderError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::Validation(fields) => Self::Validation(fields),
            QuoteError::Unavailable(msg) => Self::QuoteUnavailable(msg),
        }
    }
}
