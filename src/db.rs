//! Database connection setup

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Open the connection pool used for the lifetime of the process.
///
/// The pool is created once in `main` and injected into handlers through
/// `actix_web::web::Data`.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600));

    Database::connect(opt).await
}
