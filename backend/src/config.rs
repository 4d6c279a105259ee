use std::env;

use crate::models::location::GeoPoint;

/// Upper bound for `JWT_EXPIRY_SECONDS`: one year.
pub const MAX_SESSION_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the API runs on the volatile in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub bcrypt_cost: u32,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    // Live tracking simulation
    pub tracking_interval_seconds: u64,
    pub reference_lat: f64,
    pub reference_lon: f64,
    pub jitter_spread: f64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: required("JWT_SECRET")?,
            // One week, same lifetime as the session cookie.
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "604800".into())
                .parse()?,
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
            tracking_interval_seconds: env::var("TRACKING_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "5".into())
                .parse()?,
            reference_lat: env::var("REFERENCE_LAT")
                .unwrap_or_else(|_| "40.7128".into())
                .parse()?,
            reference_lon: env::var("REFERENCE_LON")
                .unwrap_or_else(|_| "-74.006".into())
                .parse()?,
            jitter_spread: env::var("JITTER_SPREAD")
                .unwrap_or_else(|_| "0.01".into())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tracking_interval_seconds == 0 {
            anyhow::bail!("TRACKING_INTERVAL_SECONDS must be at least 1");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31");
        }
        if !(1..=MAX_SESSION_SECONDS).contains(&self.jwt_expiry_seconds) {
            anyhow::bail!("JWT_EXPIRY_SECONDS must be between 1 and {}", MAX_SESSION_SECONDS);
        }
        Ok(())
    }

    /// Fixed point the simulated positions jitter around and the map projects from.
    pub fn reference_point(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.reference_lat,
            longitude: self.reference_lon,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            jwt_secret: "test-secret".into(),
            jwt_expiry_seconds: 3600,
            bcrypt_cost: 4,
            host: "127.0.0.1".into(),
            port: 0,
            app_base_url: "http://localhost".into(),
            tracking_interval_seconds: 5,
            reference_lat: 40.7128,
            reference_lon: -74.006,
            jitter_spread: 0.01,
        }
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
