//! Admin-triggered newsletter batch send
//!
//! One on-demand batch per call; there is no in-process scheduler or
//! recurring job. Each recipient is attempted independently and failures
//! are logged, so one bad address never aborts the batch.

use crate::category::Category;
use crate::config::AppConfig;
use crate::email::templates::send_newsletter_issue;
use crate::middleware::ClientCtx;
use crate::subscribers;
use crate::web::error::{ApiError, ApiResult};
use actix_web::{post, web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(send_newsletter);
}

#[derive(Deserialize, Validate)]
struct NewsletterForm {
    category: String,
    #[validate(length(min = 1, max = 255))]
    subject: String,
    #[validate(length(min = 1, max = 20000))]
    body: String,
}

#[derive(Serialize)]
struct NewsletterReport {
    recipients: usize,
    sent: usize,
    failed: usize,
}

#[post("/newsletter/send")]
async fn send_newsletter(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    form: web::Json<NewsletterForm>,
) -> ApiResult<HttpResponse> {
    let admin = client.require_admin()?;

    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let category = Category::parse(&form.category)
        .ok_or_else(|| ApiError::Validation(format!("Unknown category: {}", form.category)))?;

    let recipients = subscribers::recipients_for_category(&db, category).await?;

    let mut sent = 0;
    let mut failed = 0;
    for subscriber in &recipients {
        match send_newsletter_issue(
            &config.email,
            &subscriber.email,
            &form.subject,
            &form.body,
            &subscriber.unsubscribe_token,
            &config.base_url,
        )
        .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                log::warn!("Newsletter send to {} failed: {}", subscriber.email, e);
            }
        }
    }

    log::info!(
        "Newsletter for {} sent by admin {}: {} sent, {} failed",
        category,
        admin.id,
        sent,
        failed
    );

    Ok(super::ok_data(NewsletterReport {
        recipients: recipients.len(),
        sent,
        failed,
    }))
}
