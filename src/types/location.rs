//! Geographic location types

use serde::{Deserialize, Serialize};

/// A geographic point in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Round both coordinates to 5 decimal places (~1 m precision).
    /// Used for cache keys and identity comparison so that minor
    /// floating-point noise does not defeat caching.
    pub fn rounded(&self) -> RoundedLocation {
        RoundedLocation {
            lat_e5: (self.lat * 1e5).round() as i64,
            lng_e5: (self.lng * 1e5).round() as i64,
        }
    }

    /// Whether two points round to the same 5-decimal coordinate pair.
    pub fn same_point(&self, other: &Location) -> bool {
        self.rounded() == other.rounded()
    }

    /// Shift the point by a delta applied to both axes.
    pub fn offset(&self, delta: f64) -> Location {
        Location {
            lat: self.lat + delta,
            lng: self.lng + delta,
        }
    }
}

/// Integer-scaled coordinate pair, safe to use as a hash key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundedLocation {
    pub lat_e5: i64,
    pub lng_e5: i64,
}
