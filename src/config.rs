//! Configuration management

use anyhow::{Context, Result};

use crate::types::Location;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Valhalla routing engine URL (primary drive-time provider)
    pub valhalla_url: Option<String>,

    /// Google Distance Matrix API key (secondary drive-time provider)
    pub google_maps_api_key: Option<String>,

    /// Start/end point of the technician's day
    pub home_base: Location,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let valhalla_url = std::env::var("VALHALLA_URL").ok().filter(|v| !v.is_empty());
        let google_maps_api_key = std::env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|v| !v.is_empty());

        if valhalla_url.is_none() && google_maps_api_key.is_none() {
            anyhow::bail!(
                "No routing provider configured; set VALHALLA_URL and/or GOOGLE_MAPS_API_KEY"
            );
        }

        let home_base = Location::new(
            parse_env_f64("HOME_BASE_LAT", 55.7956)?,
            parse_env_f64("HOME_BASE_LNG", -3.7939)?,
        );

        Ok(Self {
            nats_url,
            database_url,
            valhalla_url,
            google_maps_api_key,
            home_base,
        })
    }
}

fn parse_env_f64(name: &str, default: f64) -> Result<f64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("{} must be a decimal number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
