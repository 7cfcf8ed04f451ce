//! Driving distance lookups.
//!
//! The quote engine only needs a distance between two places; it talks to a
//! [`DistanceOracle`]. [`GoogleDirectionsClient`] implements it over the
//! Directions JSON API.

mod google;
mod types;

pub use google::GoogleDirectionsClient;
pub use types::{LatLng, Route, RouteStep};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when looking up a route.
#[derive(Debug, Error)]
pub enum DirectionsError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The provider found no route between the two places.
    #[error("No route found from '{origin}' to '{destination}'")]
    NoRoute { origin: String, destination: String },

    /// Provider returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: String, message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Source of driving routes.
#[async_trait]
pub trait DistanceOracle: Send + Sync {
    /// Driving route from `origin` to `destination` (free-form place queries).
    async fn route(&self, origin: &str, destination: &str) -> Result<Route, DirectionsError>;

    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;
}
