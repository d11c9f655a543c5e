//! Newsletter subscriber endpoints

use crate::config::AppConfig;
use crate::email::templates::send_subscription_verification_email;
use crate::middleware::ClientCtx;
use crate::orm::subscribers as subscribers_orm;
use crate::subscribers;
use crate::web::error::{ApiError, ApiResult};
use actix_web::{get, patch, post, web, HttpResponse};
use chrono::NaiveDateTime;
use sea_orm::{query::*, DatabaseConnection, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(subscribe)
        .service(confirm)
        .service(unsubscribe_link)
        .service(unsubscribe)
        .service(update_preferences)
        .service(list_subscribers);
}

/// Subscriber as exposed over the API. Tokens stay server-side.
#[derive(Serialize)]
struct SubscriberView {
    id: i32,
    email: String,
    email_verified: bool,
    categories: serde_json::Value,
    frequency: String,
    created_at: NaiveDateTime,
}

impl From<subscribers_orm::Model> for SubscriberView {
    fn from(model: subscribers_orm::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            email_verified: model.email_verified,
            categories: model.categories,
            frequency: model.frequency,
            created_at: model.created_at,
        }
    }
}

#[derive(Deserialize)]
struct SubscribeForm {
    email: String,
    categories: Option<Vec<String>>,
    frequency: Option<String>,
}

/// Create an unverified subscription and send the confirmation email.
///
/// The email send is best-effort; the subscription is stored either way and
/// the user can subscribe again to get a fresh token.
#[post("/subscribers")]
async fn subscribe(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    form: web::Json<SubscribeForm>,
) -> ApiResult<HttpResponse> {
    let subscriber = subscribers::subscribe(
        &db,
        &form.email,
        form.categories.as_deref(),
        form.frequency.as_deref(),
    )
    .await?;

    if let Err(e) = send_subscription_verification_email(
        &config.email,
        &subscriber.email,
        &subscriber.verification_token,
        &config.base_url,
    )
    .await
    {
        log::error!(
            "Failed to send subscription verification to {}: {}",
            subscriber.email,
            e
        );
    }

    Ok(super::created_message(
        "Subscription created. Please check your email to confirm.",
    ))
}

#[derive(Deserialize)]
struct TokenParams {
    email: String,
    token: String,
}

/// Confirmation link target from the verification email.
#[get("/subscribers/confirm")]
async fn confirm(
    db: web::Data<DatabaseConnection>,
    params: web::Query<TokenParams>,
) -> ApiResult<HttpResponse> {
    subscribers::confirm(&db, &params.email, &params.token).await?;
    Ok(super::ok_message("Subscription confirmed"))
}

#[derive(Deserialize)]
struct UnsubscribeForm {
    email: String,
    token: Option<String>,
}

/// Unsubscribe link target from newsletter emails; always token-checked.
#[get("/subscribers/unsubscribe")]
async fn unsubscribe_link(
    db: web::Data<DatabaseConnection>,
    params: web::Query<TokenParams>,
) -> ApiResult<HttpResponse> {
    subscribers::unsubscribe(&db, &params.email, Some(&params.token)).await?;
    Ok(super::ok_message("You have been unsubscribed"))
}

#[post("/subscribers/unsubscribe")]
async fn unsubscribe(
    db: web::Data<DatabaseConnection>,
    form: web::Json<UnsubscribeForm>,
) -> ApiResult<HttpResponse> {
    subscribers::unsubscribe(&db, &form.email, form.token.as_deref()).await?;
    Ok(super::ok_message("You have been unsubscribed"))
}

#[derive(Deserialize)]
struct PreferencesForm {
    email: String,
    token: String,
    categories: Option<Vec<String>>,
    frequency: Option<String>,
}

#[patch("/subscribers/preferences")]
async fn update_preferences(
    db: web::Data<DatabaseConnection>,
    form: web::Json<PreferencesForm>,
) -> ApiResult<HttpResponse> {
    let subscriber = subscribers::update_preferences(
        &db,
        &form.email,
        &form.token,
        form.categories.as_deref(),
        form.frequency.as_deref(),
    )
    .await?;
    Ok(super::ok_data(SubscriberView::from(subscriber)))
}

#[derive(Deserialize)]
struct ListParams {
    page: Option<u64>,
    limit: Option<u64>,
}

/// Admin listing of subscribers.
#[get("/subscribers")]
async fn list_subscribers(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    params: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    client.require_admin()?;

    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(50);
    if page < 1 || limit < 1 {
        return Err(ApiError::Validation(
            "page and limit must be positive".to_string(),
        ));
    }

    let rows = subscribers_orm::Entity::find()
        .order_by_desc(subscribers_orm::Column::CreatedAt)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db.get_ref())
        .await?;

    let views: Vec<SubscriberView> = rows.into_iter().map(SubscriberView::from).collect();
    Ok(super::ok_data(views))
}
