//! SeaORM Entity for article_contents table
//!
//! One row per language block of an article. The slug is globally unique
//! across the whole table, not per article.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "article_contents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub article_id: i32,
    /// Block order within the article.
    pub position: i32,
    pub hreflang: String,
    pub main_title: String,
    /// JSON: ordered array of `{sub_title, paragraphs: []}` sections.
    pub sections: Json,
    pub meta_title: String,
    pub meta_description: String,
    /// JSON array of keyword strings.
    pub keywords: Json,
    pub slug: String,
    pub url_pattern: String,
    pub canonical_url: String,
    pub seo_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::articles::Entity",
        from = "Column::ArticleId",
        to = "super::articles::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Article,
}

impl Related<super::articles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
