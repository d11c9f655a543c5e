//! Account and user-administration endpoints

use crate::category::Category;
use crate::locale::Locale;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session::{hash_password, verify_password};
use crate::web::auth::AccountView;
use crate::web::error::{ApiError, ApiResult};
use actix_web::{delete, get, patch, post, web, HttpResponse};
use sea_orm::{
    entity::*, query::*, DatabaseConnection, EntityTrait, QueryOrder,
};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(me)
        .service(update_me)
        .service(change_password)
        .service(list_users)
        .service(delete_user);
}

async fn load_user(db: &DatabaseConnection, id: i32) -> ApiResult<users::Model> {
    users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

#[get("/users/me")]
async fn me(client: ClientCtx, db: web::Data<DatabaseConnection>) -> ApiResult<HttpResponse> {
    let profile = client.require_user()?;
    let user = load_user(db.get_ref(), profile.id).await?;
    Ok(super::ok_data(AccountView::from(user)))
}

#[derive(Deserialize)]
struct PreferencesForm {
    language: Option<String>,
    region: Option<String>,
    content_language: Option<String>,
}

#[derive(Deserialize)]
struct UpdateMeForm {
    preferences: Option<PreferencesForm>,
    category_interests: Option<Vec<String>>,
}

/// Parse and deduplicate category interests, erroring on unknown values.
fn normalize_interests(values: &[String]) -> ApiResult<Vec<&'static str>> {
    let mut out: Vec<&'static str> = Vec::new();
    for value in values {
        let category = Category::parse(value)
            .ok_or_else(|| ApiError::Validation(format!("Unknown category: {}", value)))?;
        if !out.contains(&category.as_str()) {
            out.push(category.as_str());
        }
    }
    Ok(out)
}

#[patch("/users/me")]
async fn update_me(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<UpdateMeForm>,
) -> ApiResult<HttpResponse> {
    let profile = client.require_user()?;
    let user = load_user(db.get_ref(), profile.id).await?;

    let mut model: users::ActiveModel = user.into();

    if let Some(preferences) = &form.preferences {
        if let Some(language) = preferences.language.as_deref() {
            let locale = Locale::parse(language)
                .ok_or_else(|| ApiError::Validation(format!("Unsupported language: {}", language)))?;
            model.preferred_language = Set(locale.as_str().to_string());
        }
        if let Some(content_language) = preferences.content_language.as_deref() {
            let locale = Locale::parse(content_language).ok_or_else(|| {
                ApiError::Validation(format!("Unsupported language: {}", content_language))
            })?;
            model.content_language = Set(locale.as_str().to_string());
        }
        if let Some(region) = preferences.region.as_deref() {
            if region.len() != 2 || !region.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ApiError::Validation(
                    "region must be a two-letter country code".to_string(),
                ));
            }
            model.preferred_region = Set(region.to_uppercase());
        }
    }

    if let Some(interests) = form.category_interests.as_deref() {
        model.category_interests = Set(serde_json::json!(normalize_interests(interests)?));
    }

    let updated = model.update(db.get_ref()).await?;
    Ok(super::ok_data(AccountView::from(updated)))
}

#[derive(Deserialize, Validate)]
struct ChangePasswordForm {
    current_password: String,
    #[validate(length(min = 8, max = 1000))]
    new_password: String,
}

#[post("/users/me/password")]
async fn change_password(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<ChangePasswordForm>,
) -> ApiResult<HttpResponse> {
    let profile = client.require_user()?;

    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let user = load_user(db.get_ref(), profile.id).await?;
    if !verify_password(&user.password, &form.current_password) {
        return Err(ApiError::Forbidden(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_password(&form.new_password).map_err(ApiError::internal)?;
    let mut model: users::ActiveModel = user.into();
    model.password = Set(password_hash);
    model.update(db.get_ref()).await?;

    log::info!("Password changed for user {}", profile.id);
    Ok(super::ok_message("Password updated"))
}

#[derive(Deserialize)]
struct ListParams {
    page: Option<u64>,
    limit: Option<u64>,
}

/// Admin listing of accounts.
#[get("/users")]
async fn list_users(
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

    let rows = users::Entity::find()
        .order_by_asc(users::Column::Id)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db.get_ref())
        .await?;

    let views: Vec<AccountView> = rows.into_iter().map(AccountView::from).collect();
    Ok(super::ok_data(views))
}

/// Admin-only hard delete of an account. Owned likes, comments and reports
/// cascade away with it.
#[delete("/users/{id}")]
async fn delete_user(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let admin = client.require_admin()?;
    let user_id = path.into_inner();

    if user_id == admin.id {
        return Err(ApiError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    let result = users::Entity::delete_by_id(user_id).exec(db.get_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    log::info!("User {} deleted by admin {}", user_id, admin.id);
    Ok(super::ok_message("User deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interests_are_deduplicated_and_checked() {
        let values = vec![
            "health".to_string(),
            "health".to_string(),
            "recipes".to_string(),
        ];
        assert_eq!(
            normalize_interests(&values).expect("valid interests"),
            vec!["health", "recipes"]
        );

        let bad = vec!["gardening".to_string()];
        assert!(normalize_interests(&bad).is_err());
    }
}
