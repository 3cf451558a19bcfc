//! Caching drive-time estimator with perturbation retries and provider fallback.
//!
//! A single estimator instance is built at startup and shared across requests;
//! the cache is the only shared mutable state in the slot engine. Concurrent
//! writes for the same key are idempotent (values derive from identical
//! inputs), so a race only costs one redundant provider call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{RouteError, RoutingProvider};
use crate::types::{Location, RoundedLocation};

/// How long a cached drive time stays valid
const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Positional offsets (degrees, applied to both axes) tried when a provider
/// cannot snap a point to the road network. Zero first so the exact pair is
/// always attempted before any perturbation.
const PERTURBATION_OFFSETS: [f64; 7] = [0.0, 0.0008, -0.0008, 0.002, -0.002, 0.005, -0.005];

/// Every origin-offset × destination-offset combination, exact pair first.
static OFFSET_GRID: Lazy<Vec<(f64, f64)>> = Lazy::new(|| {
    PERTURBATION_OFFSETS
        .iter()
        .flat_map(|&o| PERTURBATION_OFFSETS.iter().map(move |&d| (o, d)))
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    origin: RoundedLocation,
    destination: RoundedLocation,
    provider: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    minutes: i64,
    inserted_at: Instant,
}

/// TTL-expiring drive-time cache.
///
/// Constructed explicitly and passed into the estimator rather than living in
/// a global, so tests can control its lifetime and TTL.
pub struct DriveCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl DriveCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<i64> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.minutes)
    }

    fn insert(&self, key: CacheKey, minutes: i64) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            CacheEntry {
                minutes,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries (call periodically to free memory).
    pub fn evict_expired(&self) {
        let mut entries = self.entries.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }
}

impl Default for DriveCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves driving duration in whole minutes between two points.
///
/// Providers are tried in order; within a provider an unsnappable point is
/// retried across the perturbation grid before giving up on that provider.
/// First success wins.
pub struct DriveTimeEstimator {
    providers: Vec<Arc<dyn RoutingProvider>>,
    cache: DriveCache,
}

impl DriveTimeEstimator {
    pub fn new(providers: Vec<Arc<dyn RoutingProvider>>) -> Self {
        Self::with_cache(providers, DriveCache::new())
    }

    pub fn with_cache(providers: Vec<Arc<dyn RoutingProvider>>, cache: DriveCache) -> Self {
        Self { providers, cache }
    }

    /// Drive time in minutes, rounded up so travel time is never understated.
    pub async fn drive_minutes(
        &self,
        origin: &Location,
        destination: &Location,
    ) -> Result<i64, RouteError> {
        let mut last_err = RouteError::Unavailable("no routing providers configured".into());

        for provider in &self.providers {
            let key = CacheKey {
                origin: origin.rounded(),
                destination: destination.rounded(),
                provider: provider.id(),
            };

            if let Some(minutes) = self.cache.get(&key) {
                return Ok(minutes);
            }

            match self.query_provider(provider.as_ref(), origin, destination).await {
                Ok(seconds) => {
                    let minutes = (seconds / 60.0).ceil() as i64;
                    self.cache.insert(key, minutes);
                    return Ok(minutes);
                }
                Err(err) => {
                    warn!(
                        "Provider {} failed for ({:.5},{:.5})->({:.5},{:.5}): {}",
                        provider.id(),
                        origin.lat,
                        origin.lng,
                        destination.lat,
                        destination.lng,
                        err
                    );
                    last_err = err;
                }
            }
        }

        Err(match last_err {
            RouteError::Unsnappable => {
                RouteError::Unavailable("all providers exhausted (points unsnappable)".into())
            }
            other => other,
        })
    }

    /// Query one provider, walking the perturbation grid on edge-match failure.
    async fn query_provider(
        &self,
        provider: &dyn RoutingProvider,
        origin: &Location,
        destination: &Location,
    ) -> Result<f64, RouteError> {
        let mut original_err: Option<RouteError> = None;

        for &(origin_delta, dest_delta) in OFFSET_GRID.iter() {
            let o = origin.offset(origin_delta);
            let d = destination.offset(dest_delta);

            match provider.drive_seconds(&o, &d).await {
                Ok(seconds) => {
                    if origin_delta != 0.0 || dest_delta != 0.0 {
                        debug!(
                            "Provider {} succeeded at offsets ({}, {})",
                            provider.id(),
                            origin_delta,
                            dest_delta
                        );
                    }
                    return Ok(seconds);
                }
                // Only unsnappable points justify trying a shifted pair
                Err(RouteError::Unsnappable) => {
                    original_err.get_or_insert(RouteError::Unsnappable);
                }
                Err(err) => return Err(err),
            }
        }

        // Propagate the failure of the exact pair, not the last offset tried
        Err(original_err.unwrap_or_else(|| RouteError::Unavailable("perturbation grid empty".into())))
    }
}
