//! Google Distance Matrix client
//!
//! Secondary drive-time provider, used when Valhalla cannot produce a route.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{RouteError, RoutingProvider};
use crate::types::Location;

const MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Google Distance Matrix client configuration
#[derive(Debug, Clone)]
pub struct GoogleMatrixConfig {
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl GoogleMatrixConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            timeout_seconds: 30,
        }
    }
}

/// Google Distance Matrix routing client
pub struct GoogleMatrixClient {
    client: Client,
    config: GoogleMatrixConfig,
}

impl GoogleMatrixClient {
    pub fn new(config: GoogleMatrixConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

#[async_trait]
impl RoutingProvider for GoogleMatrixClient {
    async fn drive_seconds(&self, origin: &Location, destination: &Location)
        -> Result<f64, RouteError>
    {
        debug!(
            "Requesting drive time from Google: ({:.5},{:.5}) -> ({:.5},{:.5})",
            origin.lat, origin.lng, destination.lat, destination.lng
        );

        let response = self.client
            .get(MATRIX_URL)
            .query(&[
                ("origins", format!("{},{}", origin.lat, origin.lng)),
                ("destinations", format!("{},{}", destination.lat, destination.lng)),
                ("departure_time", "now".to_string()),
                ("key", self.config.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| RouteError::Unavailable(format!("Google request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RouteError::Unavailable(format!(
                "Google returned status {}",
                response.status()
            )));
        }

        let data: MatrixResponse = response
            .json()
            .await
            .map_err(|e| RouteError::Unavailable(format!("Failed to parse Google response: {}", e)))?;

        let element = data
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or_else(|| RouteError::Unavailable("Google returned no matrix element".into()))?;

        match element.status.as_str() {
            "OK" => element
                .duration
                .as_ref()
                .map(|d| d.value)
                .ok_or_else(|| RouteError::Unavailable("Google element missing duration".into())),
            // NOT_FOUND means the point could not be matched to the network
            "NOT_FOUND" => Err(RouteError::Unsnappable),
            other => Err(RouteError::Unavailable(format!(
                "Google element status {}",
                other
            ))),
        }
    }

    fn id(&self) -> &'static str {
        "google"
    }
}

// Google Distance Matrix API types

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<DurationValue>,
}

#[derive(Debug, Deserialize)]
struct DurationValue {
    /// Duration in seconds
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_ok_element() {
        let body = r#"{
            "rows": [{"elements": [{"status": "OK", "duration": {"value": 612, "text": "11 mins"}}]}],
            "status": "OK"
        }"#;
        let data: MatrixResponse = serde_json::from_str(body).unwrap();
        let element = &data.rows[0].elements[0];
        assert_eq!(element.status, "OK");
        assert_eq!(element.duration.as_ref().unwrap().value, 612.0);
    }

    #[test]
    fn test_parses_not_found_element() {
        let body = r#"{"rows": [{"elements": [{"status": "NOT_FOUND"}]}], "status": "OK"}"#;
        let data: MatrixResponse = serde_json::from_str(body).unwrap();
        assert_eq!(data.rows[0].elements[0].status, "NOT_FOUND");
        assert!(data.rows[0].elements[0].duration.is_none());
    }

    #[test]
    fn test_parses_empty_response() {
        let data: MatrixResponse = serde_json::from_str(r#"{"status": "OVER_QUERY_LIMIT"}"#).unwrap();
        assert!(data.rows.is_empty());
    }
}
