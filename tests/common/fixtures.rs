//! Shared fixtures for database-backed tests
#![allow(dead_code)]

use chrono::Utc;
use sea_orm::{entity::*, DatabaseConnection, DbErr};
use vitablog::orm::{article_contents, articles, subscribers, users};

/// Insert a user with a throwaway password hash.
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: &str,
) -> Result<users::Model, DbErr> {
    let user = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password: Set(vitablog::session::hash_password("password123").expect("hash")),
        role: Set(role.to_string()),
        email_verified: Set(true),
        verification_token: Set(None),
        preferred_language: Set("en".to_string()),
        preferred_region: Set("US".to_string()),
        content_language: Set("en".to_string()),
        category_interests: Set(serde_json::json!([])),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    user.insert(db).await
}

/// Insert a published article with one content block per (hreflang, slug)
/// pair, in order.
pub async fn create_test_article(
    db: &DatabaseConnection,
    author_id: i32,
    category: &str,
    blocks: &[(&str, &str)],
) -> Result<articles::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let article = articles::ActiveModel {
        author_id: Set(author_id),
        category: Set(category.to_string()),
        status: Set(articles::STATUS_PUBLISHED.to_string()),
        views: Set(0),
        images: Set(serde_json::json!(["cover.jpg"])),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for (position, (hreflang, slug)) in blocks.iter().copied().enumerate() {
        article_contents::ActiveModel {
            article_id: Set(article.id),
            position: Set(position as i32),
            hreflang: Set(hreflang.to_string()),
            main_title: Set(format!("Title {}", slug)),
            sections: Set(serde_json::json!([
                {"sub_title": "Section", "paragraphs": ["First paragraph."]}
            ])),
            meta_title: Set(format!("Meta {}", slug)),
            meta_description: Set(format!("Description for {}", slug)),
            keywords: Set(serde_json::json!(["test"])),
            slug: Set(slug.to_string()),
            url_pattern: Set(format!("/articles/{}", slug)),
            canonical_url: Set(format!("https://example.com/articles/{}", slug)),
            seo_type: Set("article".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(article)
}

/// Insert a verified subscriber.
pub async fn create_test_subscriber(
    db: &DatabaseConnection,
    email: &str,
    verified: bool,
    categories: &[&str],
) -> Result<subscribers::Model, DbErr> {
    let now = Utc::now().naive_utc();
    subscribers::ActiveModel {
        email: Set(email.to_string()),
        email_verified: Set(verified),
        verification_token: Set(vitablog::session::generate_token(64)),
        unsubscribe_token: Set(vitablog::session::generate_token(64)),
        categories: Set(serde_json::json!(categories)),
        frequency: Set("weekly".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
}
