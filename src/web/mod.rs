pub mod articles;
pub mod auth;
pub mod comments;
pub mod error;
pub mod feed;
pub mod locale;
pub mod newsletter;
pub mod subscribers;
pub mod users;

use actix_web::HttpResponse;
use serde::Serialize;

/// Standard success envelope: `{"success": true, "data": ...}`.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
}

/// Message-only success envelope: `{"success": true, "message": ...}`.
#[derive(Serialize)]
struct MessageEnvelope<'a> {
    success: bool,
    message: &'a str,
}

pub fn ok_data<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        success: true,
        data,
    })
}

pub fn created_data<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        success: true,
        data,
    })
}

pub fn ok_message(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(MessageEnvelope {
        success: true,
        message,
    })
}

pub fn created_message(message: &str) -> HttpResponse {
    HttpResponse::Created().json(MessageEnvelope {
        success: true,
        message,
    })
}

/// Configures the web app by adding services from each web file.
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Route resolution stops at the first match, so literal segments must
    // be registered before `{id}` captures within each module.
    conf.service(
        actix_web::web::scope("/api/v1")
            .configure(articles::configure)
            .configure(comments::configure)
            .configure(subscribers::configure)
            .configure(newsletter::configure)
            .configure(auth::configure)
            .configure(users::configure)
            .configure(locale::configure),
    );

    // The feed lives at the site root, outside the API prefix.
    feed::configure(conf);
}
