//! Test database setup and management
#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::env;

/// Connect to the test database named by TEST_DATABASE_URL.
///
/// Returns `None` when the variable is unset so DB-backed tests skip on
/// machines without a database instead of failing. The schema in
/// migrations/schema.sql must already be applied.
pub async fn setup_test_database() -> Option<DatabaseConnection> {
    let database_url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };

    match Database::connect(&database_url).await {
        Ok(db) => Some(db),
        Err(e) => panic!("Failed to connect to test database: {}", e),
    }
}

/// Cleanup function to remove test data
///
/// Truncates all tables that might contain test data. CASCADE removes
/// child rows and RESTART IDENTITY resets the id sequences.
pub async fn cleanup_test_data(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "TRUNCATE TABLE comment_reports, comment_likes, comments, article_likes, \
         article_contents, articles, subscribers, users RESTART IDENTITY CASCADE"
            .to_string(),
    ))
    .await
    .expect("Failed to clean up test data");
}
