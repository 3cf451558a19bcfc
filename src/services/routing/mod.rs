//! Drive-time providers and the caching estimator built on top of them.
//!
//! Valhalla is the primary provider, Google Distance Matrix the secondary;
//! the mock provider estimates from Haversine distance and is used in tests.

mod estimator;
mod google;
mod valhalla;

pub use estimator::DriveTimeEstimator;
pub use google::{GoogleMatrixClient, GoogleMatrixConfig};
pub use valhalla::{ValhallaClient, ValhallaConfig};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::types::Location;

/// Failure modes a routing provider can surface.
///
/// `Unsnappable` (a geocoded point the router cannot match to the road
/// network) is recoverable via perturbation retries; everything else is not.
#[derive(Debug, Clone, Error)]
pub enum RouteError {
    #[error("point not snappable to road network")]
    Unsnappable,
    #[error("route unavailable: {0}")]
    Unavailable(String),
}

/// A single origin/destination drive-time backend
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Driving duration from origin to destination, in seconds.
    async fn drive_seconds(&self, origin: &Location, destination: &Location)
        -> Result<f64, RouteError>;

    /// Stable identifier, part of every cache key.
    fn id(&self) -> &'static str;
}

/// Mock routing provider for tests and offline development.
/// Uses Haversine distance × road coefficient at a fixed average speed.
pub struct MockRoutingProvider {
    road_coefficient: f64,
    average_speed_kmh: f64,
}

impl Default for MockRoutingProvider {
    fn default() -> Self {
        Self {
            road_coefficient: crate::services::geo::ROAD_COEFFICIENT,
            average_speed_kmh: crate::services::geo::AVERAGE_SPEED_KMH,
        }
    }
}

impl MockRoutingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }
}

#[async_trait]
impl RoutingProvider for MockRoutingProvider {
    async fn drive_seconds(&self, origin: &Location, destination: &Location)
        -> Result<f64, RouteError>
    {
        let straight_line_km = crate::services::geo::haversine_distance(origin, destination);
        let road_km = straight_line_km * self.road_coefficient;
        Ok(road_km / self.average_speed_kmh * 3600.0)
    }

    fn id(&self) -> &'static str {
        "mock"
    }
}

/// Build the configured provider chain, primary first.
pub fn create_providers(config: &Config) -> Vec<Arc<dyn RoutingProvider>> {
    let mut providers: Vec<Arc<dyn RoutingProvider>> = Vec::new();

    if let Some(url) = &config.valhalla_url {
        providers.push(Arc::new(ValhallaClient::new(ValhallaConfig::new(url))));
    }
    if let Some(key) = &config.google_maps_api_key {
        providers.push(Arc::new(GoogleMatrixClient::new(GoogleMatrixConfig::new(key))));
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edinburgh() -> Location {
        Location::new(55.9533, -3.1883)
    }

    fn glasgow() -> Location {
        Location::new(55.8642, -4.2518)
    }

    #[tokio::test]
    async fn test_mock_provider_zero_for_same_point() {
        let provider = MockRoutingProvider::new();
        let secs = provider.drive_seconds(&edinburgh(), &edinburgh()).await.unwrap();
        assert!(secs < 1e-9);
    }

    #[tokio::test]
    async fn test_mock_provider_symmetric() {
        let provider = MockRoutingProvider::new();
        let there = provider.drive_seconds(&edinburgh(), &glasgow()).await.unwrap();
        let back = provider.drive_seconds(&glasgow(), &edinburgh()).await.unwrap();
        assert!((there - back).abs() < 1e-6);
        // ~86 km road at 40 km/h, a bit over two hours
        assert!(there > 5400.0 && there < 10800.0, "got {} seconds", there);
    }

    #[tokio::test]
    async fn test_mock_provider_custom_params() {
        let slow = MockRoutingProvider::with_params(1.3, 20.0);
        let fast = MockRoutingProvider::with_params(1.3, 60.0);
        let slow_secs = slow.drive_seconds(&edinburgh(), &glasgow()).await.unwrap();
        let fast_secs = fast.drive_seconds(&edinburgh(), &glasgow()).await.unwrap();
        assert!(slow_secs > fast_secs);
    }

    #[test]
    fn test_provider_ids_distinct() {
        let mock = MockRoutingProvider::new();
        let valhalla = ValhallaClient::new(ValhallaConfig::default());
        let google = GoogleMatrixClient::new(GoogleMatrixConfig::new("test-key"));
        assert_ne!(mock.id(), valhalla.id());
        assert_ne!(valhalla.id(), google.id());
    }
}
