use serde::{Deserialize, Serialize};

/// A point on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// One turn-by-turn step of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instructions: String,
    pub distance_meters: u64,
    pub duration_seconds: u64,
}

/// A driving route between two places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_meters: u64,
    /// Human-readable distance, e.g. "100 km".
    pub distance_text: String,
    pub duration_seconds: u64,
    /// Human-readable duration, e.g. "1 hour 20 mins".
    pub duration_text: String,
    pub start_location: LatLng,
    pub end_location: LatLng,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

impl Route {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters as f64 / 1000.0
    }
}

// Wire types for the Directions JSON API.

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRoute {
    #[serde(default)]
    pub legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLeg {
    pub distance: ApiValue,
    pub duration: ApiValue,
    #[serde(default)]
    pub start_location: LatLng,
    #[serde(default)]
    pub end_location: LatLng,
    #[serde(default)]
    pub steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiValue {
    pub value: u64,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiStep {
    #[serde(default)]
    pub html_instructions: String,
    pub distance: ApiValue,
    pub duration: ApiValue,
}

impl From<ApiLeg> for Route {
    fn from(leg: ApiLeg) -> Self {
        Self {
            distance_meters: leg.distance.value,
            distance_text: leg.distance.text,
            duration_seconds: leg.duration.value,
            duration_text: leg.duration.text,
            start_location: leg.start_location,
            end_location: leg.end_location,
            steps: leg
                .steps
                .into_iter()
                .map(|s| RouteStep {
                    instructions: s.html_instructions,
                    distance_meters: s.distance.value,
                    duration_seconds: s.duration.value,
                })
                .collect(),
        }
    }
}
