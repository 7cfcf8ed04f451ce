//! Recipient and parcel domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validation::{FieldValue, Form};

/// Round a money amount to cents, halves away from zero, always carrying two decimals.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Postal address shared by users and recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Query string sent to the distance oracle for this address.
    pub fn oracle_query(&self) -> String {
        format!("{}, {}", self.city.trim(), self.country.trim())
    }

    /// Whether the address carries enough for a route lookup.
    pub fn has_locality(&self) -> bool {
        !self.city.trim().is_empty() && !self.country.trim().is_empty()
    }
}

impl Form for Address {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "street" => &self.street,
            "city" => &self.city,
            "state" => &self.state,
            "zip_code" => &self.zip_code,
            "country" => &self.country,
            _ => return None,
        };
        Some(FieldValue::Text(value))
    }
}

/// Recipient details as submitted with an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(flatten)]
    pub address: Address,
}

impl Form for RecipientInfo {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "first_name" => Some(FieldValue::Text(&self.first_name)),
            "last_name" => Some(FieldValue::Text(&self.last_name)),
            "email" => Some(FieldValue::Text(&self.email)),
            "phone_number" => Some(FieldValue::Text(&self.phone_number)),
            other => self.address.field(other),
        }
    }
}

/// Contact fields of a recipient that can be edited after creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl ContactUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
    }
}

/// A stored recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    /// User who registered this recipient.
    pub created_by: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(flatten)]
    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Physical parcel measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParcelInfo {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

impl Form for ParcelInfo {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match name {
            "length" => self.length,
            "width" => self.width,
            "height" => self.height,
            "weight" => self.weight,
            _ => return None,
        };
        Some(FieldValue::Number(value))
    }
}

/// Parcel delivery status.
///
/// Serialized with the display names clients show (`"Out For Delivery"`);
/// parsing also accepts any casing and snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParcelStatus {
    Pending,
    Accepted,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl ParcelStatus {
    /// The four states a live parcel moves through, in order.
    pub const FORWARD: [ParcelStatus; 4] = [
        ParcelStatus::Pending,
        ParcelStatus::Accepted,
        ParcelStatus::OutForDelivery,
        ParcelStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::OutForDelivery => "Out For Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Position in the forward sequence. `None` for `Cancelled`.
    pub fn rank(&self) -> Option<usize> {
        Self::FORWARD.iter().position(|s| s == self)
    }

    /// Owners may cancel or re-route a parcel until it is delivered.
    pub fn is_mutable_by_owner(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Accepted | Self::OutForDelivery
        )
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown parcel status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ParcelStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "outfordelivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Serialize for ParcelStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ParcelStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A stored parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: i64,
    /// Sender (owning user).
    pub user_id: i64,
    pub recipient_id: i64,
    #[serde(flatten)]
    pub info: ParcelInfo,
    pub cost: Decimal,
    pub status: ParcelStatus,
    pub tracking_number: String,
    /// Number of paid destination changes.
    pub destination_changes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert a parcel.
#[derive(Debug, Clone)]
pub struct NewParcel {
    pub user_id: i64,
    pub recipient_id: i64,
    pub info: ParcelInfo,
    pub cost: Decimal,
}
