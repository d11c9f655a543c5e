//! Application configuration from environment variables
//!
//! Everything is loaded once at process start by `AppConfig::from_env()` and
//! handed to consumers by reference. Secrets (database credentials, SMTP
//! passwords, the session signing key) only ever come from the environment.

use crate::email::EmailConfig;
use std::env;

/// Geolocation provider chain configuration.
///
/// The primary provider is tried first; on failure or rate-limit the
/// secondary provider is tried; if both fail the hardcoded default region
/// is used.
#[derive(Clone, Debug)]
pub struct GeoConfig {
    pub primary_url: String,
    pub secondary_url: String,
    pub default_country: String,
}

impl GeoConfig {
    fn from_env() -> Self {
        Self {
            primary_url: env::var("GEO_PRIMARY_URL")
                .unwrap_or_else(|_| "https://ipapi.co".to_string()),
            secondary_url: env::var("GEO_SECONDARY_URL")
                .unwrap_or_else(|_| "http://ip-api.com/json".to_string()),
            default_country: env::var("GEO_DEFAULT_COUNTRY").unwrap_or_else(|_| "US".to_string()),
        }
    }
}

/// Top level application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Postgres connection string. Required; startup fails without it.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Public base URL used when building links in emails and feeds.
    pub base_url: String,
    /// Session cookie signing key. When absent a random key is generated
    /// and sessions invalidate on restart.
    pub secret_key: Option<String>,
    pub email: EmailConfig,
    pub geo: GeoConfig,
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// Returns an error naming the missing variable when a required value
    /// is absent. Optional values fall back to development defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            secret_key: env::var("SECRET_KEY").ok(),
            email: EmailConfig::from_env()?,
            geo: GeoConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_values_default() {
        std::env::set_var("DATABASE_URL", "postgres://localhost/vitablog");
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.geo.default_country, "US");
    }
}
