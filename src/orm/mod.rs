//! SeaORM entities, one module per table

pub mod article_contents;
pub mod article_likes;
pub mod articles;
pub mod comment_likes;
pub mod comment_reports;
pub mod comments;
pub mod subscribers;
pub mod users;
