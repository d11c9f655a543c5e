//! Integration tests for likes, comments, reports and view counting

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use vitablog::articles;
use vitablog::comments;
use vitablog::orm::{article_likes, comments as comments_orm};
use vitablog::web::error::ApiError;

#[actix_rt::test]
#[serial]
async fn like_toggle_is_idempotent_in_cardinality() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "like_author", "admin")
        .await
        .expect("Failed to create author");
    let reader = create_test_user(&db, "like_reader", "user")
        .await
        .expect("Failed to create reader");
    let article = create_test_article(&db, author.id, "health", &[("en", "likeable")])
        .await
        .expect("Failed to create article");

    let status = articles::toggle_like(&db, article.id, reader.id)
        .await
        .expect("Toggle should work");
    assert!(status.liked);
    assert_eq!(status.likes, 1);

    // Second toggle removes the like; the set never grows past one entry
    // per user.
    let status = articles::toggle_like(&db, article.id, reader.id)
        .await
        .expect("Toggle should work");
    assert!(!status.liked);
    assert_eq!(status.likes, 0);

    // Like again, then verify the row count directly.
    articles::toggle_like(&db, article.id, reader.id)
        .await
        .expect("Toggle should work");
    let rows = article_likes::Entity::find()
        .filter(article_likes::Column::ArticleId.eq(article.id))
        .filter(article_likes::Column::UserId.eq(reader.id))
        .count(&db)
        .await
        .expect("Count should work");
    assert_eq!(rows, 1);

    let missing = articles::toggle_like(&db, article.id + 999, reader.id).await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn view_increment_counts_every_call() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "view_author", "admin")
        .await
        .expect("Failed to create author");
    let article = create_test_article(&db, author.id, "fitness", &[("en", "viewed")])
        .await
        .expect("Failed to create article");

    for _ in 0..5 {
        articles::increment_views(&db, article.id)
            .await
            .expect("Increment should work");
    }

    let stats = articles::stats(&db, article.id)
        .await
        .expect("Stats should work");
    assert_eq!(stats.views, 5);

    let missing = articles::increment_views(&db, article.id + 999).await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn authors_cannot_comment_on_their_own_articles() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "comment_author", "admin")
        .await
        .expect("Failed to create author");
    let article = create_test_article(&db, author.id, "nutrition", &[("en", "commented")])
        .await
        .expect("Failed to create article");

    let result = comments::add_comment(&db, article.id, author.id, "Nice article!").await;
    assert!(matches!(result, Err(ApiError::Conflict(_))));

    let count = comments_orm::Entity::find()
        .filter(comments_orm::Column::ArticleId.eq(article.id))
        .count(&db)
        .await
        .expect("Count should work");
    assert_eq!(count, 0, "State must be unchanged");

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn one_comment_per_user_per_article() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "single_author", "admin")
        .await
        .expect("Failed to create author");
    let reader = create_test_user(&db, "single_reader", "user")
        .await
        .expect("Failed to create reader");
    let article = create_test_article(&db, author.id, "wellness", &[("en", "discussed")])
        .await
        .expect("Failed to create article");

    let first = comments::add_comment(&db, article.id, reader.id, "First thoughts")
        .await
        .expect("First comment should work");

    let second = comments::add_comment(&db, article.id, reader.id, "Second thoughts").await;
    assert!(matches!(second, Err(ApiError::Conflict(_))));

    // The first comment survives untouched and the count stays at one.
    let rows = comments_orm::Entity::find()
        .filter(comments_orm::Column::ArticleId.eq(article.id))
        .all(&db)
        .await
        .expect("Fetch should work");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, first.id);
    assert_eq!(rows[0].body, "First thoughts");

    // Missing articles produce the same combined conflict error.
    let missing = comments::add_comment(&db, article.id + 999, reader.id, "Hello").await;
    assert!(matches!(missing, Err(ApiError::Conflict(_))));

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn comment_deletion_requires_owner_or_admin() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "del_author", "admin")
        .await
        .expect("Failed to create author");
    let reader = create_test_user(&db, "del_reader", "user")
        .await
        .expect("Failed to create reader");
    let other = create_test_user(&db, "del_other", "user")
        .await
        .expect("Failed to create other");
    let article = create_test_article(&db, author.id, "recipes", &[("en", "deletable")])
        .await
        .expect("Failed to create article");

    let comment = comments::add_comment(&db, article.id, reader.id, "Tasty")
        .await
        .expect("Comment should work");

    // Only the owner can edit, and edits pass the same validation.
    let edited = comments::update_comment(&db, article.id, comment.id, reader.id, "Very tasty")
        .await
        .expect("Owner edit should work");
    assert_eq!(edited.body, "Very tasty");
    let denied = comments::update_comment(&db, article.id, comment.id, other.id, "Hijacked").await;
    assert!(matches!(denied, Err(ApiError::NotFound(_))));
    let invalid =
        comments::update_comment(&db, article.id, comment.id, reader.id, "see http://x").await;
    assert!(matches!(invalid, Err(ApiError::Validation(_))));

    // A stranger cannot delete it.
    let denied = comments::delete_comment(&db, article.id, comment.id, other.id, false).await;
    assert!(matches!(denied, Err(ApiError::NotFound(_))));

    // An admin can.
    comments::delete_comment(&db, article.id, comment.id, author.id, true)
        .await
        .expect("Admin delete should work");

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn comment_reports_are_unique_per_user() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "rep_author", "admin")
        .await
        .expect("Failed to create author");
    let commenter = create_test_user(&db, "rep_commenter", "user")
        .await
        .expect("Failed to create commenter");
    let reporter = create_test_user(&db, "rep_reporter", "user")
        .await
        .expect("Failed to create reporter");
    let article = create_test_article(&db, author.id, "health", &[("en", "reportable")])
        .await
        .expect("Failed to create article");

    let comment = comments::add_comment(&db, article.id, commenter.id, "Contentious")
        .await
        .expect("Comment should work");

    comments::report_comment(&db, comment.id, reporter.id, "spam")
        .await
        .expect("Report should work");

    let again = comments::report_comment(&db, comment.id, reporter.id, "abuse").await;
    assert!(matches!(again, Err(ApiError::Conflict(_))));

    let missing = comments::report_comment(&db, comment.id + 999, reporter.id, "spam").await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));

    let bad_reason = comments::report_comment(&db, comment.id, reporter.id, "because").await;
    assert!(matches!(bad_reason, Err(ApiError::Validation(_))));

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn comment_likes_toggle_like_article_likes() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let author = create_test_user(&db, "clike_author", "admin")
        .await
        .expect("Failed to create author");
    let commenter = create_test_user(&db, "clike_commenter", "user")
        .await
        .expect("Failed to create commenter");
    let liker = create_test_user(&db, "clike_liker", "user")
        .await
        .expect("Failed to create liker");
    let article = create_test_article(&db, author.id, "lifestyle", &[("en", "liked-comment")])
        .await
        .expect("Failed to create article");

    let comment = comments::add_comment(&db, article.id, commenter.id, "Agreed")
        .await
        .expect("Comment should work");

    let status = comments::toggle_comment_like(&db, comment.id, liker.id)
        .await
        .expect("Toggle should work");
    assert!(status.liked);
    assert_eq!(status.likes, 1);

    let status = comments::toggle_comment_like(&db, comment.id, liker.id)
        .await
        .expect("Toggle should work");
    assert!(!status.liked);
    assert_eq!(status.likes, 0);

    // Like counts show up in the listing.
    comments::toggle_comment_like(&db, comment.id, liker.id)
        .await
        .expect("Toggle should work");
    let listing = comments::list_comments(&db, article.id, 1, 20)
        .await
        .expect("Listing should work");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].likes, 1);
    assert_eq!(listing[0].username, "clike_commenter");

    cleanup_test_data(&db).await;
}
