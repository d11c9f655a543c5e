//! Integration tests for the newsletter subscription state machine

mod common;
use serial_test::serial;

use common::{database::*, fixtures::*};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use vitablog::category::Category;
use vitablog::orm::subscribers as subscribers_orm;
use vitablog::subscribers;
use vitablog::web::error::ApiError;

async fn fetch(db: &sea_orm::DatabaseConnection, email: &str) -> subscribers_orm::Model {
    subscribers_orm::Entity::find()
        .filter(subscribers_orm::Column::Email.eq(email))
        .one(db)
        .await
        .expect("Fetch should work")
        .expect("Subscriber should exist")
}

#[actix_rt::test]
#[serial]
async fn confirm_requires_matching_token() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let subscriber = subscribers::subscribe(&db, "Reader@Example.com", None, None)
        .await
        .expect("Subscribe should work");
    assert_eq!(subscriber.email, "reader@example.com");
    assert!(!subscriber.email_verified);

    // A wrong token must fail and leave the state untouched.
    let wrong = subscribers::confirm(&db, "reader@example.com", "not-the-token").await;
    assert!(matches!(wrong, Err(ApiError::NotFound(_))));
    assert!(!fetch(&db, "reader@example.com").await.email_verified);

    // The right token flips the state, case-insensitively on email.
    subscribers::confirm(&db, "READER@example.com", &subscriber.verification_token)
        .await
        .expect("Confirm should work");
    assert!(fetch(&db, "reader@example.com").await.email_verified);

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn unsubscribe_deactivates_but_keeps_the_row() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let subscriber = create_test_subscriber(&db, "leaver@example.com", true, &["health"])
        .await
        .expect("Failed to create subscriber");

    // Token-checked path rejects a bad token.
    let wrong = subscribers::unsubscribe(&db, "leaver@example.com", Some("bad-token")).await;
    assert!(matches!(wrong, Err(ApiError::NotFound(_))));
    assert!(fetch(&db, "leaver@example.com").await.email_verified);

    subscribers::unsubscribe(
        &db,
        "leaver@example.com",
        Some(&subscriber.unsubscribe_token),
    )
    .await
    .expect("Unsubscribe should work");

    let row = fetch(&db, "leaver@example.com").await;
    assert!(!row.email_verified, "Deactivated, not deleted");

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn resubscribing_a_deactivated_email_restarts_verification() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let original = create_test_subscriber(&db, "return@example.com", false, &["health"])
        .await
        .expect("Failed to create subscriber");

    let renewed = subscribers::subscribe(
        &db,
        "return@example.com",
        Some(&["recipes".to_string()]),
        Some("daily"),
    )
    .await
    .expect("Resubscribe should work");

    assert_eq!(renewed.id, original.id, "Same row, no duplicate");
    assert!(!renewed.email_verified);
    assert_ne!(renewed.verification_token, original.verification_token);
    assert_eq!(renewed.frequency, "daily");

    // An actively verified subscriber is a conflict instead.
    subscribers::confirm(&db, "return@example.com", &renewed.verification_token)
        .await
        .expect("Confirm should work");
    let dup = subscribers::subscribe(&db, "return@example.com", None, None).await;
    assert!(matches!(dup, Err(ApiError::Conflict(_))));

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn preferences_update_is_token_checked() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    let subscriber = create_test_subscriber(&db, "prefs@example.com", true, &["health"])
        .await
        .expect("Failed to create subscriber");

    let wrong = subscribers::update_preferences(
        &db,
        "prefs@example.com",
        "bad-token",
        Some(&["fitness".to_string()]),
        None,
    )
    .await;
    assert!(matches!(wrong, Err(ApiError::NotFound(_))));

    let updated = subscribers::update_preferences(
        &db,
        "prefs@example.com",
        &subscriber.unsubscribe_token,
        Some(&["fitness".to_string(), "fitness".to_string()]),
        Some("monthly"),
    )
    .await
    .expect("Update should work");

    assert_eq!(updated.categories, serde_json::json!(["fitness"]));
    assert_eq!(updated.frequency, "monthly");

    cleanup_test_data(&db).await;
}

#[actix_rt::test]
#[serial]
async fn newsletter_recipients_filter_by_category_and_verification() {
    let db = match setup_test_database().await {
        Some(db) => db,
        None => return,
    };
    cleanup_test_data(&db).await;

    create_test_subscriber(&db, "fit@example.com", true, &["fitness", "health"])
        .await
        .expect("Failed to create subscriber");
    create_test_subscriber(&db, "cook@example.com", true, &["recipes"])
        .await
        .expect("Failed to create subscriber");
    create_test_subscriber(&db, "gone@example.com", false, &["fitness"])
        .await
        .expect("Failed to create subscriber");

    let recipients = subscribers::recipients_for_category(&db, Category::Fitness)
        .await
        .expect("Recipient query should work");

    let emails: Vec<&str> = recipients.iter().map(|s| s.email.as_str()).collect();
    assert_eq!(emails, vec!["fit@example.com"]);

    cleanup_test_data(&db).await;
}
