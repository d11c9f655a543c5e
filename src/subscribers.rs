//! Newsletter subscription state machine
//!
//! unverified -> (confirm with matching token) -> verified
//! verified -> (unsubscribe, token-checked when supplied) -> deactivated
//!
//! Deactivation clears `email_verified` and keeps the row. Every transition
//! is one conditional UPDATE keyed by the normalized email; a non-matching
//! token affects zero rows and changes nothing.

use crate::category::Category;
use crate::orm::subscribers;
use crate::session::generate_token;
use crate::web::error::{ApiError, ApiResult};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Length of verification and unsubscribe tokens.
const TOKEN_LEN: usize = 64;

/// Lowercase-normalize an email before any subscriber-keyed operation.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parse and deduplicate category preferences; `None` means all categories.
pub fn normalize_categories(values: Option<&[String]>) -> ApiResult<Vec<&'static str>> {
    let values = match values {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(Category::ALL.iter().map(|c| c.as_str()).collect()),
    };

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

fn validate_frequency(frequency: &str) -> ApiResult<()> {
    if subscribers::FREQUENCIES.contains(&frequency) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Unknown frequency: {}",
            frequency
        )))
    }
}

/// Create a subscriber in the unverified state, or reset a deactivated one
/// back to unverified with fresh tokens.
///
/// Returns the subscriber row; the caller sends the verification email
/// (best-effort). An email that is already actively subscribed is a
/// conflict.
pub async fn subscribe(
    db: &DatabaseConnection,
    email: &str,
    categories: Option<&[String]>,
    frequency: Option<&str>,
) -> ApiResult<subscribers::Model> {
    let email = normalize_email(email);
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }

    let categories = normalize_categories(categories)?;
    let frequency = frequency.unwrap_or(subscribers::DEFAULT_FREQUENCY);
    validate_frequency(frequency)?;

    let now = Utc::now().naive_utc();
    let existing = subscribers::Entity::find()
        .filter(subscribers::Column::Email.eq(email.clone()))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        if existing.email_verified {
            return Err(ApiError::Conflict("Email is already subscribed".to_string()));
        }
        // Deactivated or never confirmed: restart the state machine with
        // fresh tokens. The unique index on email backs this against races.
        let mut model: subscribers::ActiveModel = existing.into();
        model.verification_token = Set(generate_token(TOKEN_LEN));
        model.unsubscribe_token = Set(generate_token(TOKEN_LEN));
        model.email_verified = Set(false);
        model.categories = Set(serde_json::json!(categories));
        model.frequency = Set(frequency.to_string());
        model.updated_at = Set(now);
        return Ok(model.update(db).await?);
    }

    let model = subscribers::ActiveModel {
        email: Set(email),
        email_verified: Set(false),
        verification_token: Set(generate_token(TOKEN_LEN)),
        unsubscribe_token: Set(generate_token(TOKEN_LEN)),
        categories: Set(serde_json::json!(categories)),
        frequency: Set(frequency.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    Ok(model.insert(db).await?)
}

/// unverified -> verified, only when the token matches the stored
/// verification token for that email.
pub async fn confirm(db: &DatabaseConnection, email: &str, token: &str) -> ApiResult<()> {
    let email = normalize_email(email);

    let result = subscribers::Entity::update_many()
        .col_expr(subscribers::Column::EmailVerified, Expr::value(true))
        .col_expr(
            subscribers::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(subscribers::Column::Email.eq(email))
        .filter(subscribers::Column::VerificationToken.eq(token))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(
            "No pending subscription matches that email and token".to_string(),
        ));
    }
    Ok(())
}

/// verified -> deactivated. When a token is supplied it must match the
/// stored unsubscribe token; the row is retained either way.
pub async fn unsubscribe(
    db: &DatabaseConnection,
    email: &str,
    token: Option<&str>,
) -> ApiResult<()> {
    let email = normalize_email(email);

    let mut update = subscribers::Entity::update_many()
        .col_expr(subscribers::Column::EmailVerified, Expr::value(false))
        .col_expr(
            subscribers::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(subscribers::Column::Email.eq(email));

    if let Some(token) = token {
        update = update.filter(subscribers::Column::UnsubscribeToken.eq(token));
    }

    let result = update.exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(
            "No subscription matches that email and token".to_string(),
        ));
    }
    Ok(())
}

/// Update category and frequency preferences, keyed by email and the
/// unsubscribe token.
pub async fn update_preferences(
    db: &DatabaseConnection,
    email: &str,
    token: &str,
    categories: Option<&[String]>,
    frequency: Option<&str>,
) -> ApiResult<subscribers::Model> {
    let email = normalize_email(email);

    let subscriber = subscribers::Entity::find()
        .filter(subscribers::Column::Email.eq(email))
        .filter(subscribers::Column::UnsubscribeToken.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No subscription matches that email and token".to_string())
        })?;

    let mut model: subscribers::ActiveModel = subscriber.into();
    if categories.is_some() {
        model.categories = Set(serde_json::json!(normalize_categories(categories)?));
    }
    if let Some(frequency) = frequency {
        validate_frequency(frequency)?;
        model.frequency = Set(frequency.to_string());
    }
    model.updated_at = Set(Utc::now().naive_utc());

    Ok(model.update(db).await?)
}

/// Verified subscribers whose category preferences include the given
/// category. Recipient set of a newsletter issue.
pub async fn recipients_for_category(
    db: &DatabaseConnection,
    category: Category,
) -> ApiResult<Vec<subscribers::Model>> {
    let verified = subscribers::Entity::find()
        .filter(subscribers::Column::EmailVerified.eq(true))
        .all(db)
        .await?;

    Ok(verified
        .into_iter()
        .filter(|s| {
            s.categories
                .as_array()
                .map(|a| a.iter().any(|v| v.as_str() == Some(category.as_str())))
                .unwrap_or(false)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_lowercased_and_trimmed() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn missing_categories_default_to_all() {
        let all = normalize_categories(None).expect("defaults should be valid");
        assert_eq!(all.len(), Category::ALL.len());

        let empty: Vec<String> = Vec::new();
        let all = normalize_categories(Some(&empty)).expect("defaults should be valid");
        assert_eq!(all.len(), Category::ALL.len());
    }

    #[test]
    fn categories_are_deduplicated() {
        let values = vec![
            "fitness".to_string(),
            "fitness".to_string(),
            "health".to_string(),
        ];
        let out = normalize_categories(Some(&values)).expect("valid categories");
        assert_eq!(out, vec!["fitness", "health"]);
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let values = vec!["astrology".to_string()];
        assert!(matches!(
            normalize_categories(Some(&values)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn frequency_is_validated() {
        assert!(validate_frequency("weekly").is_ok());
        assert!(validate_frequency("hourly").is_err());
    }
}
