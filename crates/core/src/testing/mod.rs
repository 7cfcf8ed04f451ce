//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the two network collaborators (the directions provider
//! and the mail relay) so lifecycle and HTTP tests run without either.
//!
//! # Example
//!
//! ```rust,ignore
//! use sendit_core::testing::{fixtures, MockDistanceOracle, MockMailer};
//!
//! let oracle = MockDistanceOracle::new();
//! oracle.set_distance_meters(64_000).await;
//!
//! let mailer = MockMailer::new();
//! mailer.fail_for("bounce@example.com").await;
//! ```

mod mock_distance_oracle;
mod mock_mailer;

pub use mock_distance_oracle::MockDistanceOracle;
pub use mock_mailer::MockMailer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::account::SignupRequest;
    use crate::directions::{LatLng, Route};
    use crate::shipment::{Address, ParcelInfo, RecipientInfo};

    /// A complete Kenyan address in `city`.
    pub fn address(city: &str) -> Address {
        Address {
            street: "1 Main Street".to_string(),
            city: city.to_string(),
            state: city.to_string(),
            zip_code: "00100".to_string(),
            country: "Kenya".to_string(),
        }
    }

    /// A small valid parcel.
    pub fn parcel_info() -> ParcelInfo {
        ParcelInfo {
            length: 30.0,
            width: 20.0,
            height: 10.0,
            weight: 2.5,
        }
    }

    /// A valid recipient living in `city`.
    pub fn recipient_info(first_name: &str, city: &str) -> RecipientInfo {
        RecipientInfo {
            first_name: first_name.to_string(),
            last_name: "Otieno".to_string(),
            email: format!("{}@example.com", first_name.to_lowercase()),
            phone_number: "0711000000".to_string(),
            address: address(city),
        }
    }

    /// A valid signup with a full address in `city`.
    pub fn signup(first_name: &str, email: &str, city: &str) -> SignupRequest {
        SignupRequest {
            first_name: first_name.to_string(),
            last_name: "Mwangi".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            phone_number: "0700000000".to_string(),
            address: address(city),
        }
    }

    /// A route of the given length with plausible text fields.
    pub fn route(distance_meters: u64) -> Route {
        Route {
            distance_meters,
            distance_text: format!("{} km", distance_meters / 1000),
            duration_seconds: distance_meters / 20,
            duration_text: format!("{} mins", distance_meters / 1200),
            start_location: LatLng {
                lat: -1.2864,
                lng: 36.8172,
            },
            end_location: LatLng {
                lat: -0.3031,
                lng: 36.0800,
            },
            steps: Vec::new(),
        }
    }
}
