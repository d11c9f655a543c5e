//! SeaORM Entity for subscribers table
//!
//! Unsubscribing clears email_verified; the row is retained, never deleted.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscribers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Lowercase-normalized before every read or write.
    pub email: String,
    pub email_verified: bool,
    pub verification_token: String,
    pub unsubscribe_token: String,
    /// JSON array of category values the subscriber wants.
    pub categories: Json,
    /// "daily", "weekly" or "monthly".
    pub frequency: String,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

pub const FREQUENCIES: [&str; 3] = ["daily", "weekly", "monthly"];
pub const DEFAULT_FREQUENCY: &str = "weekly";

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
