//! Valhalla routing engine client
//!
//! Valhalla API documentation:
//! https://valhalla.github.io/valhalla/api/matrix/api-reference/

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RouteError, RoutingProvider};
use crate::types::Location;

/// Valhalla edge-matching failure ("No suitable edges near location")
const NO_SUITABLE_EDGES: u32 = 171;

/// Valhalla client configuration
#[derive(Debug, Clone)]
pub struct ValhallaConfig {
    /// Base URL of Valhalla server (e.g., "http://localhost:8002")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ValhallaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl ValhallaConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// Valhalla routing client
pub struct ValhallaClient {
    client: Client,
    config: ValhallaConfig,
}

impl ValhallaClient {
    pub fn new(config: ValhallaConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Build a one-source one-target matrix request
    fn build_matrix_request(&self, origin: &Location, destination: &Location) -> MatrixRequest {
        MatrixRequest {
            sources: vec![ValhallaLocation::from(origin)],
            targets: vec![ValhallaLocation::from(destination)],
            costing: "auto".to_string(),
            units: "kilometers".to_string(),
        }
    }
}

#[async_trait]
impl RoutingProvider for ValhallaClient {
    async fn drive_seconds(&self, origin: &Location, destination: &Location)
        -> Result<f64, RouteError>
    {
        let request = self.build_matrix_request(origin, destination);
        let url = format!("{}/sources_to_targets", self.config.base_url);

        debug!(
            "Requesting drive time from Valhalla: ({:.5},{:.5}) -> ({:.5},{:.5})",
            origin.lat, origin.lng, destination.lat, destination.lng
        );

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RouteError::Unavailable(format!("Valhalla request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // Valhalla reports edge-matching failures with a structured
            // error_code in the body; only those are retryable via perturbation.
            if let Ok(err) = serde_json::from_str::<ValhallaError>(&body) {
                if err.error_code == NO_SUITABLE_EDGES {
                    return Err(RouteError::Unsnappable);
                }
            }
            return Err(RouteError::Unavailable(format!(
                "Valhalla returned error {}: {}",
                status, body
            )));
        }

        let matrix_response: MatrixResponse = response
            .json()
            .await
            .map_err(|e| RouteError::Unavailable(format!("Failed to parse Valhalla response: {}", e)))?;

        matrix_response
            .sources_to_targets
            .first()
            .and_then(|row| row.first())
            .and_then(|cell| cell.time)
            .ok_or_else(|| RouteError::Unavailable("Valhalla returned no duration for pair".into()))
    }

    fn id(&self) -> &'static str {
        "valhalla"
    }
}

// Valhalla API types

#[derive(Debug, Serialize)]
struct MatrixRequest {
    sources: Vec<ValhallaLocation>,
    targets: Vec<ValhallaLocation>,
    costing: String,
    units: String,
}

#[derive(Debug, Serialize, Clone)]
struct ValhallaLocation {
    lat: f64,
    lon: f64,
    /// Radius in meters for snapping to roads (default ~35m, we use much
    /// larger because geocoded coordinates are often building centroids)
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

impl From<&Location> for ValhallaLocation {
    fn from(value: &Location) -> Self {
        Self {
            lat: value.lat,
            lon: value.lng,
            radius: Some(500),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    sources_to_targets: Vec<Vec<MatrixCell>>,
}

#[derive(Debug, Deserialize)]
struct MatrixCell {
    /// Time in seconds
    time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ValhallaError {
    error_code: u32,
}
