//! Geolocation lookup with a provider fallback chain
//!
//! Used to default a new account's region and content language. The lookup
//! degrades gracefully: primary provider, then secondary provider on any
//! failure or rate-limit, then a hardcoded default region. It never fails
//! the caller.

use crate::config::GeoConfig;
use crate::locale::Locale;
use serde::Deserialize;
use std::time::Duration;

/// Resolved region for a client address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeoRegion {
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    /// Content language suggested for that country.
    pub locale: Locale,
}

/// Response shape of the primary provider (ipapi.co).
#[derive(Deserialize)]
struct PrimaryResponse {
    country_code: Option<String>,
}

/// Response shape of the secondary provider (ip-api.com).
#[derive(Deserialize)]
struct SecondaryResponse {
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

/// Build the outbound HTTP client shared by all lookups.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(4))
        .build()
        .unwrap_or_default()
}

/// Content language spoken in a country, for preference defaults.
pub fn locale_for_country(country: &str) -> Locale {
    match country {
        "ES" | "MX" | "AR" | "CO" | "CL" | "PE" => Locale::Es,
        "FR" | "BE" | "SN" => Locale::Fr,
        "DE" | "AT" | "CH" => Locale::De,
        "IT" => Locale::It,
        "PT" | "BR" | "AO" => Locale::Pt,
        _ => Locale::En,
    }
}

/// Look up the region for an IP address.
///
/// Tries the primary provider, falls back to the secondary provider on
/// error or rate-limit, and finally to the configured default country.
pub async fn lookup_region(client: &reqwest::Client, config: &GeoConfig, ip: &str) -> GeoRegion {
    match lookup_primary(client, config, ip).await {
        Ok(country) => return region(country),
        Err(e) => log::warn!("Primary geolocation lookup failed for {}: {}", ip, e),
    }

    match lookup_secondary(client, config, ip).await {
        Ok(country) => return region(country),
        Err(e) => log::warn!("Secondary geolocation lookup failed for {}: {}", ip, e),
    }

    log::debug!(
        "Geolocation fell back to default region {} for {}",
        config.default_country,
        ip
    );
    region(config.default_country.clone())
}

fn region(country: String) -> GeoRegion {
    let locale = locale_for_country(&country);
    GeoRegion { country, locale }
}

async fn lookup_primary(
    client: &reqwest::Client,
    config: &GeoConfig,
    ip: &str,
) -> Result<String, anyhow::Error> {
    let url = format!("{}/{}/json/", config.primary_url.trim_end_matches('/'), ip);
    let response = client.get(&url).send().await?;

    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        anyhow::bail!("rate limited");
    }
    let body: PrimaryResponse = response.error_for_status()?.json().await?;
    body.country_code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| anyhow::anyhow!("no country code in response"))
}

async fn lookup_secondary(
    client: &reqwest::Client,
    config: &GeoConfig,
    ip: &str,
) -> Result<String, anyhow::Error> {
    let url = format!("{}/{}", config.secondary_url.trim_end_matches('/'), ip);
    let response = client.get(&url).send().await?;

    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        anyhow::bail!("rate limited");
    }
    let body: SecondaryResponse = response.error_for_status()?.json().await?;
    body.country_code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| anyhow::anyhow!("no country code in response"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_to_locale_mapping() {
        assert_eq!(locale_for_country("MX"), Locale::Es);
        assert_eq!(locale_for_country("BR"), Locale::Pt);
        assert_eq!(locale_for_country("DE"), Locale::De);
        assert_eq!(locale_for_country("JP"), Locale::En);
        assert_eq!(locale_for_country(""), Locale::En);
    }
}
