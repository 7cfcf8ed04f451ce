use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::UserSummary;
use crate::shipment::{Parcel, ParcelInfo, ParcelStatus, Recipient, RecipientInfo};

/// An order as submitted by a sender: who receives it and what is shipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderRequest {
    pub recipient: RecipientInfo,
    pub parcel: ParcelInfo,
}

/// A parcel for a recipient that already exists.
#[derive(Debug, Clone, Deserialize)]
pub struct ParcelRequest {
    pub recipient_id: i64,
    #[serde(flatten)]
    pub parcel: ParcelInfo,
}

/// The records created by a successful order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub recipient: Recipient,
    pub parcel: Parcel,
}

/// A parcel together with both parties.
#[derive(Debug, Clone, Serialize)]
pub struct ParcelView {
    #[serde(flatten)]
    pub parcel: Parcel,
    pub sender: UserSummary,
    pub recipient: Recipient,
}

impl ParcelView {
    /// Case-insensitive substring match over sender name, recipient name and tracking number.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.sender.full_name().to_lowercase().contains(&query)
            || self.recipient.full_name().to_lowercase().contains(&query)
            || self.parcel.tracking_number.to_lowercase().contains(&query)
    }
}

/// Result of an admin status change.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub parcel: Parcel,
    pub previous: ParcelStatus,
}

/// Result of re-routing a parcel.
#[derive(Debug, Clone, Serialize)]
pub struct DestinationChange {
    pub parcel: Parcel,
    pub recipient: Recipient,
    /// Price of the new route before the fine.
    pub base_cost: Decimal,
    pub fine: Decimal,
}
