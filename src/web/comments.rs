//! Comment endpoints: CRUD, likes and reports

use crate::comments;
use crate::config::AppConfig;
use crate::email::templates::send_comment_report_notice;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::web::error::ApiResult;
use actix_web::{delete, get, patch, post, web, HttpResponse};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_comments)
        .service(add_comment)
        .service(update_comment)
        .service(delete_comment)
        .service(toggle_comment_like)
        .service(report_comment);
}

#[derive(Deserialize)]
struct PageParams {
    page: Option<u64>,
    limit: Option<u64>,
}

#[get("/articles/{id}/comments")]
async fn list_comments(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    params: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let views = comments::list_comments(
        &db,
        path.into_inner(),
        params.page.unwrap_or(1),
        params.limit.unwrap_or(20),
    )
    .await?;
    Ok(super::ok_data(views))
}

#[derive(Deserialize)]
struct CommentForm {
    comment: String,
}

#[post("/articles/{id}/comments")]
async fn add_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<CommentForm>,
) -> ApiResult<HttpResponse> {
    let user = client.require_user()?;
    let comment = comments::add_comment(&db, path.into_inner(), user.id, &form.comment).await?;
    Ok(super::created_data(comment))
}

/// Owners may edit their own comment body.
#[patch("/articles/{article_id}/comments/{comment_id}")]
async fn update_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Json<CommentForm>,
) -> ApiResult<HttpResponse> {
    let user = client.require_user()?;
    let (article_id, comment_id) = path.into_inner();

    let comment =
        comments::update_comment(&db, article_id, comment_id, user.id, &form.comment).await?;
    Ok(super::ok_data(comment))
}

/// Owners delete their own comments; admins delete any.
#[delete("/articles/{article_id}/comments/{comment_id}")]
async fn delete_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> ApiResult<HttpResponse> {
    let user = client.require_user()?;
    let (article_id, comment_id) = path.into_inner();

    comments::delete_comment(&db, article_id, comment_id, user.id, user.is_admin).await?;
    Ok(super::ok_message("Comment deleted"))
}

#[post("/comments/{id}/like")]
async fn toggle_comment_like(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let user = client.require_user()?;
    let status = comments::toggle_comment_like(&db, path.into_inner(), user.id).await?;
    Ok(super::ok_data(status))
}

#[derive(Deserialize)]
struct ReportForm {
    reason: String,
}

/// Report a comment, at most once per user, and notify its author.
///
/// The notification is fire-and-forget: a failed email is logged and never
/// fails the report.
#[post("/comments/{id}/report")]
async fn report_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    form: web::Json<ReportForm>,
) -> ApiResult<HttpResponse> {
    let user = client.require_user()?;
    let comment = comments::report_comment(&db, path.into_inner(), user.id, &form.reason).await?;

    let db = db.get_ref().clone();
    let config = config.get_ref().clone();
    let reason = form.reason.clone();
    actix_web::rt::spawn(async move {
        let author = match users::Entity::find_by_id(comment.user_id).one(&db).await {
            Ok(Some(author)) => author,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Failed to load comment author for report notice: {}", e);
                return;
            }
        };

        let excerpt: String = comment.body.chars().take(120).collect();
        if let Err(e) = send_comment_report_notice(
            &config.email,
            &author.email,
            &author.username,
            &excerpt,
            &reason,
        )
        .await
        {
            log::warn!(
                "Failed to send report notice to user {}: {}",
                author.id,
                e
            );
        }
    });

    Ok(super::ok_message("Comment reported"))
}
