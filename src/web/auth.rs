//! Registration, login and account recovery endpoints

use crate::config::AppConfig;
use crate::email::templates::{send_account_verification_email, send_password_reset_email};
use crate::geo;
use crate::ip::extract_client_ip;
use crate::orm::users;
use crate::session::{generate_token, hash_password, sign_in, sign_out, verify_password};
use crate::web::error::{ApiError, ApiResult};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(register)
        .service(login)
        .service(logout)
        .service(confirm_email)
        .service(request_password_reset)
        .service(confirm_password_reset);
}

/// Account data returned after login or from /users/me.
#[derive(Serialize)]
pub(super) struct AccountView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub email_verified: bool,
    pub preferences: PreferencesView,
    pub category_interests: serde_json::Value,
}

#[derive(Serialize)]
pub(super) struct PreferencesView {
    pub language: String,
    pub region: String,
    pub content_language: String,
}

impl From<users::Model> for AccountView {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            email_verified: user.email_verified,
            preferences: PreferencesView {
                language: user.preferred_language,
                region: user.preferred_region,
                content_language: user.content_language,
            },
            category_interests: user.category_interests,
        }
    }
}

#[derive(Deserialize, Validate)]
struct RegisterForm {
    #[validate(length(min = 3, max = 255))]
    username: String,
    #[validate(length(min = 8, max = 1000))]
    password: String,
    #[validate(email)]
    email: String,
}

/// Register a new account.
///
/// Preferences are defaulted from a geolocation lookup of the client IP;
/// the lookup degrades through a provider fallback chain and never fails
/// registration. The verification email is best-effort too.
#[post("/auth/register")]
async fn register(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    http: web::Data<reqwest::Client>,
    form: web::Json<RegisterForm>,
) -> ApiResult<HttpResponse> {
    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();

    let taken = users::Entity::find()
        .filter(
            Condition::any()
                .add(users::Column::Username.eq(username.clone()))
                .add(users::Column::Email.eq(email.clone())),
        )
        .one(db.get_ref())
        .await?;
    if taken.is_some() {
        return Err(ApiError::Conflict(
            "Username or email is already in use".to_string(),
        ));
    }

    let password_hash = hash_password(&form.password).map_err(ApiError::internal)?;

    let region = match extract_client_ip(&req) {
        Some(ip) => geo::lookup_region(&http, &config.geo, &ip).await,
        None => geo::GeoRegion {
            country: config.geo.default_country.clone(),
            locale: geo::locale_for_country(&config.geo.default_country),
        },
    };

    let token = generate_token(64);
    let user = users::ActiveModel {
        username: Set(username.clone()),
        email: Set(email.clone()),
        password: Set(password_hash),
        role: Set("user".to_string()),
        email_verified: Set(false),
        verification_token: Set(Some(token.clone())),
        preferred_language: Set(region.locale.as_str().to_string()),
        preferred_region: Set(region.country.clone()),
        content_language: Set(region.locale.as_str().to_string()),
        category_interests: Set(serde_json::json!([])),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let result = users::Entity::insert(user).exec(db.get_ref()).await?;
    let user_id = result.last_insert_id;

    if let Err(e) =
        send_account_verification_email(&config.email, &email, &username, &token, &config.base_url)
            .await
    {
        // Token is saved; the user can request a resend later.
        log::error!("Failed to send verification email to {}: {}", email, e);
    }

    log::info!("New user registered: {} (user_id: {})", username, user_id);

    Ok(super::created_message(
        "Registration successful. Please check your email to verify your account.",
    ))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[post("/auth/login")]
async fn login(
    session: actix_session::Session,
    db: web::Data<DatabaseConnection>,
    form: web::Json<LoginForm>,
) -> ApiResult<HttpResponse> {
    let identity = form.username.trim();

    // The identity field accepts username or email.
    let user = users::Entity::find()
        .filter(
            Condition::any()
                .add(users::Column::Username.eq(identity))
                .add(users::Column::Email.eq(identity.to_lowercase())),
        )
        .one(db.get_ref())
        .await?;

    let user = match user {
        Some(user) if verify_password(&user.password, &form.password) => user,
        // One error for both bad name and bad password.
        _ => {
            return Err(ApiError::Unauthorized(
                "Invalid username or password".to_string(),
            ))
        }
    };

    sign_in(&session, user.id).map_err(ApiError::internal)?;

    log::info!("User {} signed in", user.id);
    Ok(super::ok_data(AccountView::from(user)))
}

#[post("/auth/logout")]
async fn logout(session: actix_session::Session) -> ApiResult<HttpResponse> {
    sign_out(&session);
    Ok(super::ok_message("Signed out"))
}

#[derive(Deserialize)]
struct ConfirmEmailParams {
    email: String,
    token: String,
}

/// Verification link target from the registration email.
#[get("/auth/confirm-email")]
async fn confirm_email(
    db: web::Data<DatabaseConnection>,
    params: web::Query<ConfirmEmailParams>,
) -> ApiResult<HttpResponse> {
    let email = params.email.trim().to_lowercase();

    let result = users::Entity::update_many()
        .col_expr(users::Column::EmailVerified, Expr::value(true))
        .col_expr(
            users::Column::VerificationToken,
            Expr::value(Option::<String>::None),
        )
        .filter(users::Column::Email.eq(email))
        .filter(users::Column::VerificationToken.eq(params.token.clone()))
        .exec(db.get_ref())
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(
            "No account matches that email and token".to_string(),
        ));
    }
    Ok(super::ok_message("Email verified"))
}

#[derive(Deserialize, Validate)]
struct PasswordResetRequestForm {
    #[validate(email)]
    email: String,
}

/// Request a password reset token.
///
/// Always answers with the same message so the endpoint does not reveal
/// whether an account exists.
#[post("/auth/password-reset")]
async fn request_password_reset(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    form: web::Json<PasswordResetRequestForm>,
) -> ApiResult<HttpResponse> {
    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let email = form.email.trim().to_lowercase();

    match users::Entity::find()
        .filter(users::Column::Email.eq(email.clone()))
        .one(db.get_ref())
        .await
    {
        Ok(Some(user)) => {
            let token = generate_token(64);
            let expires = Utc::now().naive_utc() + Duration::hours(1);

            let username = user.username.clone();
            let mut model: users::ActiveModel = user.into();
            model.reset_password_token = Set(Some(token.clone()));
            model.reset_password_expires = Set(Some(expires));
            model.update(db.get_ref()).await?;

            if let Err(e) = send_password_reset_email(
                &config.email,
                &email,
                &username,
                &token,
                &config.base_url,
            )
            .await
            {
                log::error!("Failed to send password reset email: {}", e);
                // Don't fail the request - token is saved, user can try again
            }

            log::info!("Password reset requested for user: {}", username);
        }
        Ok(None) => {
            log::debug!("Password reset requested for non-existent email: {}", email);
        }
        Err(e) => {
            return Err(ApiError::internal(e));
        }
    }

    Ok(super::ok_message(
        "If an account exists with that email, you will receive a password reset link shortly.",
    ))
}

#[derive(Deserialize, Validate)]
struct PasswordResetConfirmForm {
    token: String,
    #[validate(length(min = 8, max = 1000))]
    password: String,
}

/// Redeem a reset token. Tokens are single-use and expire after one hour.
#[post("/auth/password-reset/confirm")]
async fn confirm_password_reset(
    db: web::Data<DatabaseConnection>,
    form: web::Json<PasswordResetConfirmForm>,
) -> ApiResult<HttpResponse> {
    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let user = users::Entity::find()
        .filter(users::Column::ResetPasswordToken.eq(form.token.clone()))
        .filter(users::Column::ResetPasswordExpires.gt(Utc::now().naive_utc()))
        .one(db.get_ref())
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("This password reset link is invalid or has expired".to_string())
        })?;

    let password_hash = hash_password(&form.password).map_err(ApiError::internal)?;

    let user_id = user.id;
    let mut model: users::ActiveModel = user.into();
    model.password = Set(password_hash);
    model.reset_password_token = Set(None);
    model.reset_password_expires = Set(None);
    model.update(db.get_ref()).await?;

    log::info!("Password reset successful for user_id: {}", user_id);
    Ok(super::ok_message("Password updated. You can now sign in."))
}
