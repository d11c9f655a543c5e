//! Locale detection endpoint
//!
//! Suggests a content language for the client based on a geolocation lookup
//! of their IP. Degrades to the configured default region, never errors.

use crate::config::AppConfig;
use crate::geo;
use crate::ip::extract_client_ip;
use crate::web::error::ApiResult;
use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Serialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(detect_locale);
}

#[derive(Serialize)]
struct DetectedLocale {
    country: String,
    locale: &'static str,
}

#[get("/locale/detect")]
async fn detect_locale(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    http: web::Data<reqwest::Client>,
) -> ApiResult<HttpResponse> {
    let region = match extract_client_ip(&req) {
        Some(ip) => geo::lookup_region(&http, &config.geo, &ip).await,
        None => geo::GeoRegion {
            country: config.geo.default_country.clone(),
            locale: geo::locale_for_country(&config.geo.default_country),
        },
    };

    Ok(super::ok_data(DetectedLocale {
        country: region.country,
        locale: region.locale.as_str(),
    }))
}
