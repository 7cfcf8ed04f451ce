//! Google Directions API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::DirectionsResponse;
use super::{DirectionsError, DistanceOracle, Route};
use crate::config::DirectionsConfig;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

const SERVICE: &str = "directions";

/// Directions API client.
pub struct GoogleDirectionsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoogleDirectionsClient {
    pub fn new(config: &DirectionsConfig) -> Result<Self, DirectionsError> {
        if config.api_key.trim().is_empty() {
            return Err(DirectionsError::NotConfigured(
                "Directions API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch_route(&self, origin: &str, destination: &str) -> Result<Route, DirectionsError> {
        let url = format!("{}/directions/json", self.base_url);

        debug!("Directions lookup: origin='{}', destination='{}'", origin, destination);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("origin", origin),
                ("destination", destination),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(DirectionsError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectionsError::ApiError {
                status: status.as_u16().to_string(),
                message: body,
            });
        }

        let body: DirectionsResponse = response.json().await.map_err(|e| {
            DirectionsError::ParseError(format!("Failed to parse directions response: {}", e))
        })?;

        let no_route = || DirectionsError::NoRoute {
            origin: origin.to_string(),
            destination: destination.to_string(),
        };

        match body.status.as_str() {
            "OK" => body
                .routes
                .into_iter()
                .next()
                .and_then(|route| route.legs.into_iter().next())
                .map(Route::from)
                .ok_or_else(no_route),
            "ZERO_RESULTS" | "NOT_FOUND" => Err(no_route()),
            "OVER_QUERY_LIMIT" => Err(DirectionsError::RateLimitExceeded),
            "REQUEST_DENIED" => Err(DirectionsError::NotConfigured(
                body.error_message
                    .unwrap_or_else(|| "Request denied".to_string()),
            )),
            other => Err(DirectionsError::ApiError {
                status: other.to_string(),
                message: body.error_message.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl DistanceOracle for GoogleDirectionsClient {
    async fn route(&self, origin: &str, destination: &str) -> Result<Route, DirectionsError> {
        let start = Instant::now();
        let result = self.fetch_route(origin, destination).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&[SERVICE, "route"])
            .observe(start.elapsed().as_secs_f64());
        let outcome = if result.is_ok() { "success" } else { "error" };
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[SERVICE, "route", outcome])
            .inc();

        result
    }

    fn name(&self) -> &'static str {
        "google_directions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    /// Serve a canned directions API on a random local port.
    async fn spawn_directions_api() -> String {
        async fn directions(
            Query(params): Query<HashMap<String, String>>,
        ) -> Result<Json<serde_json::Value>, StatusCode> {
            if params.get("mode").map(String::as_str) != Some("driving") {
                return Err(StatusCode::BAD_REQUEST);
            }
            if params.get("key").map(String::as_str) != Some("test-key") {
                return Ok(Json(serde_json::json!({
                    "status": "REQUEST_DENIED",
                    "error_message": "The provided API key is invalid."
                })));
            }

            let destination = params.get("destination").cloned().unwrap_or_default();
            let body = match destination.as_str() {
                "Atlantis, Ocean" => serde_json::json!({ "status": "ZERO_RESULTS", "routes": [] }),
                "Broken, Land" => serde_json::json!({ "status": "UNKNOWN_ERROR" }),
                "Teapot, Land" => return Err(StatusCode::IM_A_TEAPOT),
                _ => serde_json::json!({
                    "status": "OK",
                    "routes": [{
                        "legs": [{
                            "distance": { "text": "100 km", "value": 100000 },
                            "duration": { "text": "1 hour 20 mins", "value": 4800 },
                            "start_location": { "lat": -1.28, "lng": 36.82 },
                            "end_location": { "lat": -0.72, "lng": 36.43 },
                            "steps": []
                        }]
                    }]
                }),
            };
            Ok(Json(body))
        }

        let app = Router::new().route("/directions/json", get(directions));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String, api_key: &str) -> GoogleDirectionsClient {
        GoogleDirectionsClient::new(&DirectionsConfig {
            api_key: api_key.to_string(),
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = GoogleDirectionsClient::new(&DirectionsConfig {
            api_key: "  ".to_string(),
            base_url: "http://localhost".to_string(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(DirectionsError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_route_ok() {
        let base_url = spawn_directions_api().await;
        let client = client(base_url, "test-key");

        let route = client.route("Nairobi, Kenya", "Naivasha, Kenya").await.unwrap();

        assert_eq!(route.distance_meters, 100_000);
        assert_eq!(route.distance_text, "100 km");
        assert_eq!(route.duration_text, "1 hour 20 mins");
        assert_eq!(client.name(), "google_directions");
    }

    #[tokio::test]
    async fn test_zero_results_is_no_route() {
        let base_url = spawn_directions_api().await;
        let client = client(base_url, "test-key");

        let result = client.route("Nairobi, Kenya", "Atlantis, Ocean").await;
        assert!(matches!(result, Err(DirectionsError::NoRoute { .. })));
    }

    #[tokio::test]
    async fn test_denied_key() {
        let base_url = spawn_directions_api().await;
        let client = client(base_url, "wrong-key");

        let result = client.route("Nairobi, Kenya", "Naivasha, Kenya").await;
        assert!(matches!(result, Err(DirectionsError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_unknown_status_is_api_error() {
        let base_url = spawn_directions_api().await;
        let client = client(base_url, "test-key");

        let result = client.route("Nairobi, Kenya", "Broken, Land").await;
        assert!(matches!(
            result,
            Err(DirectionsError::ApiError { ref status, .. }) if status == "UNKNOWN_ERROR"
        ));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let base_url = spawn_directions_api().await;
        let client = client(base_url, "test-key");

        let result = client.route("Nairobi, Kenya", "Teapot, Land").await;
        assert!(matches!(
            result,
            Err(DirectionsError::ApiError { ref status, .. }) if status == "418"
        ));
    }
}
