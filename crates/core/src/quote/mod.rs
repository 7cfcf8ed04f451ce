//! Distance-based shipping quotes.
//!
//! A quote is the driving distance between two addresses priced at a flat
//! per-kilometre rate. Parcel dimensions are validated but do not affect the
//! price.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::directions::DistanceOracle;
use crate::metrics;
use crate::shipment::{round_money, Address, ParcelInfo};
use crate::validation::{validate, FieldErrors, LOCALITY_FORM, PARCEL_FORM};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Quote unavailable: {0}")]
    Unavailable(String),
}

/// A priced route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub distance_km: f64,
    pub distance_text: String,
    pub duration_text: String,
    pub cost: Decimal,
}

/// Prices routes returned by a [`DistanceOracle`].
pub struct QuoteEngine {
    oracle: Option<Arc<dyn DistanceOracle>>,
    rate_per_km: Decimal,
    timeout: Duration,
}

impl QuoteEngine {
    /// `oracle` may be `None` when no directions provider is configured; every
    /// quote then fails with `Unavailable`.
    pub fn new(
        oracle: Option<Arc<dyn DistanceOracle>>,
        rate_per_km: Decimal,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            rate_per_km,
            timeout,
        }
    }

    pub fn rate_per_km(&self) -> Decimal {
        self.rate_per_km
    }

    /// Price of a route of `distance_km`.
    pub fn price(&self, distance_km: Decimal) -> Decimal {
        round_money(distance_km * self.rate_per_km)
    }

    /// Validate the inputs, then price the driving route from `origin` to `destination`.
    pub async fn compute_quote(
        &self,
        origin: &Address,
        destination: &Address,
        parcel: &ParcelInfo,
    ) -> Result<Quote, QuoteError> {
        let mut errors = FieldErrors::new();
        errors.merge_prefixed("origin", validate(origin, LOCALITY_FORM));
        errors.merge_prefixed("destination", validate(destination, LOCALITY_FORM));
        errors.merge_prefixed("parcel", validate(parcel, PARCEL_FORM));
        if let Err(errors) = errors.into_result() {
            metrics::QUOTES_TOTAL.with_label_values(&["invalid"]).inc();
            return Err(QuoteError::Validation(errors));
        }

        self.quote_route(origin, destination).await
    }

    /// Price the route between two addresses that were already validated.
    pub async fn quote_route(
        &self,
        origin: &Address,
        destination: &Address,
    ) -> Result<Quote, QuoteError> {
        let result = self.lookup(origin, destination).await;
        let label = if result.is_ok() { "success" } else { "unavailable" };
        metrics::QUOTES_TOTAL.with_label_values(&[label]).inc();
        result
    }

    async fn lookup(&self, origin: &Address, destination: &Address) -> Result<Quote, QuoteError> {
        let oracle = self.oracle.as_ref().ok_or_else(|| {
            QuoteError::Unavailable("no directions provider configured".to_string())
        })?;

        let from = origin.oracle_query();
        let to = destination.oracle_query();

        let route = match tokio::time::timeout(self.timeout, oracle.route(&from, &to)).await {
            Ok(Ok(route)) => route,
            Ok(Err(e)) => {
                warn!(oracle = oracle.name(), from = %from, to = %to, "Route lookup failed: {}", e);
                return Err(QuoteError::Unavailable(e.to_string()));
            }
            Err(_) => {
                warn!(oracle = oracle.name(), from = %from, to = %to, "Route lookup timed out");
                return Err(QuoteError::Unavailable(format!(
                    "route lookup timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let distance_km = Decimal::from(route.distance_meters) / Decimal::from(1000);
        let cost = self.price(distance_km);
        let distance_km = route.distance_km();

        debug!(distance_km, cost = %cost, "Quote computed");
        metrics::QUOTE_DISTANCE_KM
            .with_label_values(&[])
            .observe(distance_km);

        Ok(Quote {
            distance_km,
            distance_text: route.distance_text,
            duration_text: route.duration_text,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockDistanceOracle};

    fn engine(oracle: MockDistanceOracle) -> QuoteEngine {
        QuoteEngine::new(
            Some(Arc::new(oracle)),
            Decimal::new(5, 2),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn test_hundred_km_costs_five() {
        let oracle = MockDistanceOracle::new();
        oracle.set_distance_meters(100_000).await;
        let engine = engine(oracle);

        let quote = engine
            .compute_quote(
                &fixtures::address("Nairobi"),
                &fixtures::address("Naivasha"),
                &fixtures::parcel_info(),
            )
            .await
            .unwrap();

        assert_eq!(quote.cost.to_string(), "5.00");
        assert_eq!(quote.distance_km, 100.0);
    }

    #[tokio::test]
    async fn test_cost_is_rounded_to_cents() {
        let oracle = MockDistanceOracle::new();
        // 64.1 km * 0.05 = 3.205 -> 3.21
        oracle.set_distance_meters(64_100).await;
        let engine = engine(oracle);

        let quote = engine
            .compute_quote(
                &fixtures::address("Nairobi"),
                &fixtures::address("Thika"),
                &fixtures::parcel_info(),
            )
            .await
            .unwrap();

        assert_eq!(quote.cost.to_string(), "3.21");
    }

    #[test]
    fn test_price_matches_rate() {
        let engine = QuoteEngine::new(None, Decimal::new(5, 2), Duration::from_secs(1));
        for km in [1u32, 7, 64, 100, 333, 1250] {
            let expected = round_money(Decimal::from(km) * Decimal::new(5, 2));
            assert_eq!(engine.price(Decimal::from(km)), expected);
        }
        assert_eq!(engine.price(Decimal::new(641, 1)).to_string(), "3.21");
    }

    #[tokio::test]
    async fn test_oracle_receives_city_country_queries() {
        let oracle = Arc::new(MockDistanceOracle::new());
        let engine = QuoteEngine::new(
            Some(oracle.clone() as Arc<dyn DistanceOracle>),
            Decimal::new(5, 2),
            Duration::from_secs(10),
        );

        engine
            .compute_quote(
                &fixtures::address("Nairobi"),
                &fixtures::address("Mombasa"),
                &fixtures::parcel_info(),
            )
            .await
            .unwrap();

        let calls = oracle.recorded_calls().await;
        assert_eq!(
            calls,
            vec![("Nairobi, Kenya".to_string(), "Mombasa, Kenya".to_string())]
        );
    }

    #[tokio::test]
    async fn test_validation_happens_before_oracle() {
        let oracle = Arc::new(MockDistanceOracle::new());
        let engine = QuoteEngine::new(
            Some(oracle.clone() as Arc<dyn DistanceOracle>),
            Decimal::new(5, 2),
            Duration::from_secs(10),
        );

        let mut parcel = fixtures::parcel_info();
        parcel.height = 0.0;
        let mut destination = fixtures::address("Mombasa");
        destination.city.clear();

        let err = engine
            .compute_quote(&fixtures::address("Nairobi"), &destination, &parcel)
            .await
            .unwrap_err();

        let QuoteError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("parcel.height"), Some("Must be positive"));
        assert_eq!(fields.get("destination.city"), Some("Required"));
        assert!(oracle.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_failure_is_unavailable() {
        let oracle = MockDistanceOracle::new();
        oracle
            .set_next_error(crate::directions::DirectionsError::NoRoute {
                origin: "a".to_string(),
                destination: "b".to_string(),
            })
            .await;
        let engine = engine(oracle);

        let result = engine
            .compute_quote(
                &fixtures::address("Nairobi"),
                &fixtures::address("Mombasa"),
                &fixtures::parcel_info(),
            )
            .await;
        assert!(matches!(result, Err(QuoteError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_oracle_timeout_is_unavailable() {
        let oracle = MockDistanceOracle::new();
        oracle.set_delay(Duration::from_millis(200)).await;
        let engine = QuoteEngine::new(
            Some(Arc::new(oracle)),
            Decimal::new(5, 2),
            Duration::from_millis(20),
        );

        let result = engine
            .compute_quote(
                &fixtures::address("Nairobi"),
                &fixtures::address("Mombasa"),
                &fixtures::parcel_info(),
            )
            .await;
        assert!(matches!(result, Err(QuoteError::Unavailable(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_no_oracle_configured() {
        let engine = QuoteEngine::new(None, Decimal::new(5, 2), Duration::from_secs(1));
        let result = engine
            .compute_quote(
                &fixtures::address("Nairobi"),
                &fixtures::address("Mombasa"),
                &fixtures::parcel_info(),
            )
            .await;
        assert!(matches!(result, Err(QuoteError::Unavailable(_))));
    }
}
