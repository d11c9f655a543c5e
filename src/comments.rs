//! Comment engagement service
//!
//! Validation runs synchronously before storage is touched; every mutation
//! is then a single conditional statement, so there is no read-then-write
//! window between the business checks and the insert.

use crate::orm::{comment_likes, comment_reports, comments, users};
use crate::web::error::{ApiError, ApiResult};
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, Statement,
};
use serde::Serialize;
use std::collections::HashMap;

/// Hard cap on comment length, in characters.
pub const MAX_COMMENT_CHARS: usize = 600;

/// Reject invalid comment bodies before any storage work.
///
/// Rules: non-empty after trimming, at most 600 characters, and no "http"
/// substring anywhere (anti-spam heuristic, deliberately not a URL parser).
pub fn validate_comment_body(body: &str) -> ApiResult<()> {
    if body.trim().is_empty() {
        return Err(ApiError::Validation("Comment must not be empty".to_string()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(ApiError::Validation(format!(
            "Comment must not exceed {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    if body.contains("http") {
        return Err(ApiError::Validation(
            "Comment must not contain links".to_string(),
        ));
    }
    Ok(())
}

/// Validate a report reason against the fixed enum.
pub fn validate_report_reason(reason: &str) -> ApiResult<()> {
    if comment_reports::REASONS.contains(&reason) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Unknown report reason: {}",
            reason
        )))
    }
}

/// One comment joined with its author's username and like count.
#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub article_id: i32,
    pub user_id: i32,
    pub username: String,
    pub body: String,
    pub likes: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Add a comment to an article.
///
/// One conditional insert enforces, atomically: the article exists, the
/// acting user is not its author, and the user has no existing comment on
/// it. When the condition fails the caller gets a single combined error;
/// the cases are deliberately not distinguished, so there is no check/insert
/// race to exploit. The unique index over (article_id, user_id) backs the
/// same invariant against concurrent inserts.
pub async fn add_comment(
    db: &DatabaseConnection,
    article_id: i32,
    user_id: i32,
    body: &str,
) -> ApiResult<comments::Model> {
    validate_comment_body(body)?;

    let now = Utc::now().naive_utc();
    let result = db
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"INSERT INTO comments (article_id, user_id, body, created_at, updated_at)
               SELECT a.id, $2, $3, $4, $4 FROM articles a
               WHERE a.id = $1
                 AND a.author_id <> $2
                 AND NOT EXISTS (
                     SELECT 1 FROM comments c WHERE c.article_id = $1 AND c.user_id = $2
                 )"#,
            vec![
                article_id.into(),
                user_id.into(),
                body.to_owned().into(),
                now.into(),
            ],
        ))
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "Article not found, you are the author, or you already commented".to_string(),
        ));
    }

    comments::Entity::find()
        .filter(comments::Column::ArticleId.eq(article_id))
        .filter(comments::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::internal("comment vanished after insert"))
}

/// Edit a comment. Owner only; the body passes the same validation as a
/// new comment and the update is conditional on (article, comment, owner)
/// all matching.
pub async fn update_comment(
    db: &DatabaseConnection,
    article_id: i32,
    comment_id: i32,
    requester_id: i32,
    body: &str,
) -> ApiResult<comments::Model> {
    validate_comment_body(body)?;

    let result = comments::Entity::update_many()
        .col_expr(comments::Column::Body, Expr::value(body.to_owned()))
        .col_expr(
            comments::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(comments::Column::Id.eq(comment_id))
        .filter(comments::Column::ArticleId.eq(article_id))
        .filter(comments::Column::UserId.eq(requester_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    comments::Entity::find_by_id(comment_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::internal("comment vanished after update"))
}

/// Remove a comment. Owners delete their own; admins delete any.
pub async fn delete_comment(
    db: &DatabaseConnection,
    article_id: i32,
    comment_id: i32,
    requester_id: i32,
    requester_is_admin: bool,
) -> ApiResult<()> {
    let mut delete = comments::Entity::delete_many()
        .filter(comments::Column::Id.eq(comment_id))
        .filter(comments::Column::ArticleId.eq(article_id));

    if !requester_is_admin {
        delete = delete.filter(comments::Column::UserId.eq(requester_id));
    }

    let result = delete.exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }
    Ok(())
}

/// Toggle the acting user's membership in a comment's like set. Same
/// read-then-conditional-write shape as article likes.
pub async fn toggle_comment_like(
    db: &DatabaseConnection,
    comment_id: i32,
    user_id: i32,
) -> ApiResult<crate::articles::LikeStatus> {
    let existing = comment_likes::Entity::find()
        .filter(comment_likes::Column::CommentId.eq(comment_id))
        .filter(comment_likes::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    let liked = if existing.is_some() {
        comment_likes::Entity::delete_many()
            .filter(comment_likes::Column::CommentId.eq(comment_id))
            .filter(comment_likes::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        false
    } else {
        let result = db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"INSERT INTO comment_likes (comment_id, user_id, created_at)
                   SELECT c.id, $2, $3 FROM comments c WHERE c.id = $1
                   ON CONFLICT (comment_id, user_id) DO NOTHING"#,
                vec![comment_id.into(), user_id.into(), Utc::now().naive_utc().into()],
            ))
            .await?;

        if result.rows_affected() == 0 {
            let exists = comments::Entity::find_by_id(comment_id).one(db).await?;
            if exists.is_none() {
                return Err(ApiError::NotFound("Comment not found".to_string()));
            }
        }
        true
    };

    let likes = comment_likes::Entity::find()
        .filter(comment_likes::Column::CommentId.eq(comment_id))
        .count(db)
        .await? as u64;

    Ok(crate::articles::LikeStatus { liked, likes })
}

/// Record a report against a comment, at most one per (comment, user).
///
/// Returns the reported comment so the caller can notify its author.
pub async fn report_comment(
    db: &DatabaseConnection,
    comment_id: i32,
    user_id: i32,
    reason: &str,
) -> ApiResult<comments::Model> {
    validate_report_reason(reason)?;

    let result = db
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"INSERT INTO comment_reports (comment_id, user_id, reason, reported_at)
               SELECT c.id, $2, $3, $4 FROM comments c WHERE c.id = $1
               ON CONFLICT (comment_id, user_id) DO NOTHING"#,
            vec![
                comment_id.into(),
                user_id.into(),
                reason.to_owned().into(),
                Utc::now().naive_utc().into(),
            ],
        ))
        .await?;

    let comment = comments::Entity::find_by_id(comment_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "You already reported this comment".to_string(),
        ));
    }

    Ok(comment)
}

/// Paginated comments of an article, newest first, joined with usernames
/// and per-comment like counts.
pub async fn list_comments(
    db: &DatabaseConnection,
    article_id: i32,
    page: u64,
    limit: u64,
) -> ApiResult<Vec<CommentView>> {
    if page < 1 || limit < 1 {
        return Err(ApiError::Validation(
            "page and limit must be positive".to_string(),
        ));
    }

    let rows = comments::Entity::find()
        .filter(comments::Column::ArticleId.eq(article_id))
        .order_by_desc(comments::Column::CreatedAt)
        .offset((page - 1) * limit)
        .limit(limit)
        .all(db)
        .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let comment_ids: Vec<i32> = rows.iter().map(|c| c.id).collect();
    let user_ids: Vec<i32> = rows.iter().map(|c| c.user_id).collect();

    let authors: HashMap<i32, String> = users::Entity::find()
        .filter(users::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    // Fetch the page's like rows and count in memory.
    let mut like_counts: HashMap<i32, u64> = HashMap::new();
    for like in comment_likes::Entity::find()
        .filter(comment_likes::Column::CommentId.is_in(comment_ids))
        .all(db)
        .await?
    {
        *like_counts.entry(like.comment_id).or_insert(0) += 1;
    }

    Ok(rows
        .into_iter()
        .map(|c| CommentView {
            id: c.id,
            article_id: c.article_id,
            username: authors
                .get(&c.user_id)
                .cloned()
                .unwrap_or_else(|| "deleted".to_string()),
            user_id: c.user_id,
            body: c.body,
            likes: like_counts.get(&c.id).copied().unwrap_or(0),
            created_at: c.created_at,
            updated_at: c.updated_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_comment_is_rejected() {
        assert!(validate_comment_body("").is_err());
        assert!(validate_comment_body("   \n\t").is_err());
    }

    #[test]
    fn six_hundred_chars_accepted_six_hundred_one_rejected() {
        let ok: String = "a".repeat(600);
        assert!(validate_comment_body(&ok).is_ok());

        let too_long: String = "a".repeat(601);
        assert!(matches!(
            validate_comment_body(&too_long),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn length_is_measured_in_characters_not_bytes() {
        let multibyte: String = "é".repeat(600);
        assert!(validate_comment_body(&multibyte).is_ok());
    }

    #[test]
    fn http_substring_rejected_anywhere() {
        assert!(validate_comment_body("see http://spam.example").is_err());
        assert!(validate_comment_body("https is also caught").is_err());
        assert!(validate_comment_body("xhttpx").is_err());
        assert!(validate_comment_body("a perfectly fine comment").is_ok());
    }

    #[test]
    fn report_reasons_validate_against_enum() {
        assert!(validate_report_reason("spam").is_ok());
        assert!(validate_report_reason("misinformation").is_ok());
        assert!(validate_report_reason("because").is_err());
    }
}
