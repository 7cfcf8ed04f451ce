//! Mock distance oracle for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::fixtures;
use crate::directions::{DirectionsError, DistanceOracle, Route};

/// Mock implementation of the DistanceOracle trait.
///
/// Returns a fixed distance (100 km unless changed), optionally overridden per
/// destination query. Every call is recorded as `(origin, destination)`.
///
/// # Example
///
/// ```rust,ignore
/// use sendit_core::testing::MockDistanceOracle;
///
/// let oracle = MockDistanceOracle::new();
/// oracle.set_distance_for("Nakuru, Kenya", 64_000).await;
/// ```
#[derive(Debug)]
pub struct MockDistanceOracle {
    default_meters: Arc<RwLock<u64>>,
    by_destination: Arc<RwLock<HashMap<String, u64>>>,
    calls: Arc<RwLock<Vec<(String, String)>>>,
    next_error: Arc<RwLock<Option<DirectionsError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockDistanceOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDistanceOracle {
    pub fn new() -> Self {
        Self {
            default_meters: Arc::new(RwLock::new(100_000)),
            by_destination: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
        }
    }

    /// Distance returned for any destination without an override.
    pub async fn set_distance_meters(&self, meters: u64) {
        *self.default_meters.write().await = meters;
    }

    /// Distance returned when the destination query equals `destination`.
    pub async fn set_distance_for(&self, destination: &str, meters: u64) {
        self.by_destination
            .write()
            .await
            .insert(destination.to_string(), meters);
    }

    /// Make the next call fail with `error`.
    pub async fn set_next_error(&self, error: DirectionsError) {
        *self.next_error.write().await = Some(error);
    }

    /// Sleep this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn recorded_calls(&self) -> Vec<(String, String)> {
        self.calls.read().await.clone()
    }

    async fn take_error(&self) -> Option<DirectionsError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl DistanceOracle for MockDistanceOracle {
    async fn route(&self, origin: &str, destination: &str) -> Result<Route, DirectionsError> {
        self.calls
            .write()
            .await
            .push((origin.to_string(), destination.to_string()));

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        let meters = match self.by_destination.read().await.get(destination) {
            Some(meters) => *meters,
            None => *self.default_meters.read().await,
        };

        Ok(fixtures::route(meters))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_and_override() {
        let oracle = MockDistanceOracle::new();
        oracle.set_distance_for("Nakuru, Kenya", 64_000).await;

        let route = oracle.route("Nairobi, Kenya", "Mombasa, Kenya").await.unwrap();
        assert_eq!(route.distance_meters, 100_000);

        let route = oracle.route("Nairobi, Kenya", "Nakuru, Kenya").await.unwrap();
        assert_eq!(route.distance_meters, 64_000);

        assert_eq!(oracle.recorded_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_error_is_one_shot() {
        let oracle = MockDistanceOracle::new();
        oracle
            .set_next_error(DirectionsError::RateLimitExceeded)
            .await;

        assert!(oracle.route("a", "b").await.is_err());
        assert!(oracle.route("a", "b").await.is_ok());
    }
}
