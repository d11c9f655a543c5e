//! Article query and engagement service
//!
//! Locale-resolved lookups, filtered pagination with projection tiers, and
//! the atomic engagement mutations (like toggle, view increment). All
//! concurrent safety rests on single-statement conditional updates; there is
//! no application-level locking.

use crate::category::Category;
use crate::locale::{resolve_content, Locale};
use crate::orm::{article_contents, article_likes, articles, comments};
use crate::web::error::{ApiError, ApiResult};
use chrono::{NaiveDateTime, Utc};
use futures::join;
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, Order, QueryFilter, Statement,
};
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: u64 = 9;
pub const MAX_PAGE_SIZE: u64 = 50;

/// Named field subsets returned by listing queries.
///
/// "full" returns everything; "featured" and "dashboard" return the minimal
/// subsets their list views need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldTier {
    Featured,
    Dashboard,
    Full,
}

impl FieldTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "featured" => Some(FieldTier::Featured),
            "dashboard" => Some(FieldTier::Dashboard),
            "full" => Some(FieldTier::Full),
            _ => None,
        }
    }
}

/// Sortable article columns. Titles are per-locale and not sortable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Views,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created_at" => Some(SortField::CreatedAt),
            "updated_at" => Some(SortField::UpdatedAt),
            "views" => Some(SortField::Views),
            _ => None,
        }
    }

    fn column(self) -> articles::Column {
        match self {
            SortField::CreatedAt => articles::Column::CreatedAt,
            SortField::UpdatedAt => articles::Column::UpdatedAt,
            SortField::Views => articles::Column::Views,
        }
    }
}

/// Inputs of the paginated/filtered listing.
#[derive(Clone, Debug)]
pub struct ArticleQuery {
    pub page: u64,
    pub limit: u64,
    pub sort: SortField,
    pub order: Order,
    pub locale: Locale,
    pub category: Option<Category>,
    pub slug: Option<String>,
    pub query: Option<String>,
    pub exclude_ids: Vec<i32>,
    pub fields: FieldTier,
    pub skip_count: bool,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortField::CreatedAt,
            order: Order::Desc,
            locale: Locale::En,
            category: None,
            slug: None,
            query: None,
            exclude_ids: Vec::new(),
            fields: FieldTier::Featured,
            skip_count: false,
        }
    }
}

impl ArticleQuery {
    /// Structural validation shared by every listing variant.
    pub fn validate(&self) -> ApiResult<()> {
        if self.page < 1 {
            return Err(ApiError::Validation("page must be at least 1".to_string()));
        }
        if self.limit < 1 {
            return Err(ApiError::Validation("limit must be positive".to_string()));
        }
        if self.limit > MAX_PAGE_SIZE {
            return Err(ApiError::Validation(format!(
                "limit must not exceed {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.category.is_some() && self.slug.is_some() {
            return Err(ApiError::Validation(
                "category and slug are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    /// The "paginated" variant additionally requires a search filter.
    pub fn validate_paginated(&self) -> ApiResult<()> {
        self.validate()?;
        if self.query.is_none() && self.category.is_none() {
            return Err(ApiError::Validation(
                "either query or category is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One article rendered with its locale-resolved content block.
///
/// Optional fields are filled in per projection tier and omitted from the
/// JSON otherwise.
#[derive(Clone, Debug, Serialize)]
pub struct ArticleView {
    pub id: i32,
    pub category: String,
    pub title: String,
    pub slug: String,
    pub hreflang: String,
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_type: Option<String>,
}

/// Build the serialized view of one (article, content block) pair.
pub fn build_view(
    article: &articles::Model,
    content: &article_contents::Model,
    tier: FieldTier,
) -> ArticleView {
    let first_image = article
        .images
        .as_array()
        .and_then(|a| a.first())
        .cloned();

    let mut view = ArticleView {
        id: article.id,
        category: article.category.clone(),
        title: content.main_title.clone(),
        slug: content.slug.clone(),
        hreflang: content.hreflang.clone(),
        created_at: article.created_at,
        image: first_image,
        status: None,
        views: None,
        updated_at: None,
        images: None,
        sections: None,
        meta_title: None,
        meta_description: None,
        keywords: None,
        url_pattern: None,
        canonical_url: None,
        seo_type: None,
    };

    if tier == FieldTier::Dashboard || tier == FieldTier::Full {
        view.status = Some(article.status.clone());
        view.views = Some(article.views);
        view.updated_at = Some(article.updated_at);
    }

    if tier == FieldTier::Full {
        view.image = None;
        view.images = Some(article.images.clone());
        view.sections = Some(content.sections.clone());
        view.meta_title = Some(content.meta_title.clone());
        view.meta_description = Some(content.meta_description.clone());
        view.keywords = Some(content.keywords.clone());
        view.url_pattern = Some(content.url_pattern.clone());
        view.canonical_url = Some(content.canonical_url.clone());
        view.seo_type = Some(content.seo_type.clone());
    }

    view
}

/// One page of listing results. Totals are omitted when the caller asked to
/// skip the count query.
#[derive(Debug, Serialize)]
pub struct ArticlePage {
    pub data: Vec<ArticleView>,
    pub page: u64,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_docs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
}

/// Engagement counters of one article.
#[derive(Debug, Serialize)]
pub struct ArticleStats {
    pub views: i64,
    pub likes: u64,
    pub comments: u64,
}

/// Result of a like toggle.
#[derive(Debug, Serialize)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes: u64,
}

/// Look up a published article by the slug of any of its language blocks.
///
/// The requested slug wins resolution, so a localized slug returns its own
/// block regardless of the request locale.
pub async fn find_by_slug(
    db: &DatabaseConnection,
    slug: &str,
    locale: Locale,
) -> ApiResult<ArticleView> {
    let content = article_contents::Entity::find()
        .filter(article_contents::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    let article = articles::Entity::find_by_id(content.article_id)
        .filter(articles::Column::Status.eq(articles::STATUS_PUBLISHED))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    let blocks = load_contents(db, article.id).await?;
    let resolved = resolve_content(&blocks, Some(slug), locale)
        .ok_or_else(|| ApiError::NotFound("Article has no content".to_string()))?;

    Ok(build_view(&article, resolved, FieldTier::Full))
}

/// Look up an article by id, resolving content for the locale.
pub async fn find_by_id(
    db: &DatabaseConnection,
    id: i32,
    locale: Locale,
    tier: FieldTier,
    include_unpublished: bool,
) -> ApiResult<ArticleView> {
    let mut select = articles::Entity::find_by_id(id);
    if !include_unpublished {
        select = select.filter(articles::Column::Status.eq(articles::STATUS_PUBLISHED));
    }
    let article = select
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    let blocks = load_contents(db, article.id).await?;
    let resolved = resolve_content(&blocks, None, locale)
        .ok_or_else(|| ApiError::NotFound("Article has no content".to_string()))?;

    Ok(build_view(&article, resolved, tier))
}

/// Paginated, filtered listing with locale-resolved single-language content.
pub async fn list(db: &DatabaseConnection, query: &ArticleQuery) -> ApiResult<ArticlePage> {
    query.validate()?;

    let mut select = articles::Entity::find();

    // Only the admin dashboard sees unpublished articles.
    if query.fields != FieldTier::Dashboard {
        select = select.filter(articles::Column::Status.eq(articles::STATUS_PUBLISHED));
    }

    if let Some(category) = query.category {
        select = select.filter(articles::Column::Category.eq(category.as_str()));
    }

    if let Some(slug) = query.slug.as_deref() {
        match article_contents::Entity::find()
            .filter(article_contents::Column::Slug.eq(slug))
            .one(db)
            .await?
        {
            Some(content) => {
                select = select.filter(articles::Column::Id.eq(content.article_id));
            }
            None => return Ok(empty_page(query)),
        }
    }

    if let Some(text) = query.query.as_deref() {
        let matching = matching_article_ids(db, text).await?;
        if matching.is_empty() {
            return Ok(empty_page(query));
        }
        select = select.filter(articles::Column::Id.is_in(matching));
    }

    if !query.exclude_ids.is_empty() {
        select = select.filter(articles::Column::Id.is_not_in(query.exclude_ids.clone()));
    }

    // Counting a large filtered collection is expensive; callers that don't
    // need page totals set skip_count and we never issue the COUNT.
    let (total_docs, total_pages) = if query.skip_count {
        (None, None)
    } else {
        let total = select.clone().count(db).await? as u64;
        (Some(total), Some((total + query.limit - 1) / query.limit))
    };

    let rows = select
        .order_by(query.sort.column(), query.order.clone())
        .offset((query.page - 1) * query.limit)
        .limit(query.limit)
        .all(db)
        .await?;

    let mut contents_by_article = load_contents_for(db, rows.iter().map(|a| a.id)).await?;

    let mut data = Vec::with_capacity(rows.len());
    for article in &rows {
        let blocks = contents_by_article.remove(&article.id).unwrap_or_default();
        match resolve_content(&blocks, None, query.locale) {
            Some(content) => data.push(build_view(article, content, query.fields)),
            None => log::warn!("Article {} has no content blocks, skipping", article.id),
        }
    }

    Ok(ArticlePage {
        data,
        page: query.page,
        limit: query.limit,
        total_docs,
        total_pages,
    })
}

fn empty_page(query: &ArticleQuery) -> ArticlePage {
    ArticlePage {
        data: Vec::new(),
        page: query.page,
        limit: query.limit,
        total_docs: (!query.skip_count).then(|| 0),
        total_pages: (!query.skip_count).then(|| 0),
    }
}

/// Ids of articles whose content matches a free-text query on title or SEO
/// metadata, in any language.
async fn matching_article_ids(db: &DatabaseConnection, text: &str) -> Result<Vec<i32>, ApiError> {
    let rows = article_contents::Entity::find()
        .filter(
            Condition::any()
                .add(article_contents::Column::MainTitle.contains(text))
                .add(article_contents::Column::MetaTitle.contains(text))
                .add(article_contents::Column::MetaDescription.contains(text)),
        )
        .all(db)
        .await?;

    let mut ids: Vec<i32> = rows.into_iter().map(|c| c.article_id).collect();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// All language blocks of one article, in block order.
pub async fn load_contents(
    db: &DatabaseConnection,
    article_id: i32,
) -> Result<Vec<article_contents::Model>, ApiError> {
    Ok(article_contents::Entity::find()
        .filter(article_contents::Column::ArticleId.eq(article_id))
        .order_by_asc(article_contents::Column::Position)
        .all(db)
        .await?)
}

/// Language blocks for a set of articles, grouped by article id.
async fn load_contents_for(
    db: &DatabaseConnection,
    article_ids: impl Iterator<Item = i32>,
) -> Result<HashMap<i32, Vec<article_contents::Model>>, ApiError> {
    let ids: Vec<i32> = article_ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = article_contents::Entity::find()
        .filter(article_contents::Column::ArticleId.is_in(ids))
        .order_by_asc(article_contents::Column::Position)
        .all(db)
        .await?;

    let mut grouped: HashMap<i32, Vec<article_contents::Model>> = HashMap::new();
    for row in rows {
        grouped.entry(row.article_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Slugs from the given set that are already taken anywhere in the
/// collection. Used for the create/update conflict check; the unique index
/// on the slug column backs it against races.
pub async fn slugs_in_use(
    db: &DatabaseConnection,
    slugs: &[String],
) -> Result<Vec<String>, ApiError> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }
    Ok(article_contents::Entity::find()
        .filter(article_contents::Column::Slug.is_in(slugs.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.slug)
        .collect())
}

/// Atomically bump the view counter. Repeated calls increment repeatedly;
/// there is no per-session deduplication.
pub async fn increment_views(db: &DatabaseConnection, article_id: i32) -> ApiResult<()> {
    let result = articles::Entity::update_many()
        .col_expr(
            articles::Column::Views,
            Expr::col(articles::Column::Views).add(1),
        )
        .filter(articles::Column::Id.eq(article_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Article not found".to_string()));
    }
    Ok(())
}

/// Toggle the acting user's membership in an article's like set.
///
/// Membership is read first, then one conditional statement adds or removes
/// it. Two concurrent toggles from the same user may both run; the unique
/// index keeps the set consistent and the reported status is best-effort.
pub async fn toggle_like(
    db: &DatabaseConnection,
    article_id: i32,
    user_id: i32,
) -> ApiResult<LikeStatus> {
    let existing = article_likes::Entity::find()
        .filter(article_likes::Column::ArticleId.eq(article_id))
        .filter(article_likes::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    let liked = if existing.is_some() {
        article_likes::Entity::delete_many()
            .filter(article_likes::Column::ArticleId.eq(article_id))
            .filter(article_likes::Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        false
    } else {
        // Set-insert guarded by article existence, one statement.
        let result = db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"INSERT INTO article_likes (article_id, user_id, created_at)
                   SELECT a.id, $2, $3 FROM articles a WHERE a.id = $1
                   ON CONFLICT (article_id, user_id) DO NOTHING"#,
                vec![article_id.into(), user_id.into(), Utc::now().naive_utc().into()],
            ))
            .await?;

        if result.rows_affected() == 0 {
            // Either the article is gone or a concurrent toggle won the race.
            let exists = articles::Entity::find_by_id(article_id).one(db).await?;
            if exists.is_none() {
                return Err(ApiError::NotFound("Article not found".to_string()));
            }
        }
        true
    };

    let likes = article_likes::Entity::find()
        .filter(article_likes::Column::ArticleId.eq(article_id))
        .count(db)
        .await? as u64;

    Ok(LikeStatus { liked, likes })
}

/// Engagement counters for one article, gathered concurrently.
pub async fn stats(db: &DatabaseConnection, article_id: i32) -> ApiResult<ArticleStats> {
    let article = articles::Entity::find_by_id(article_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    let (likes, comment_count) = join!(
        article_likes::Entity::find()
            .filter(article_likes::Column::ArticleId.eq(article_id))
            .count(db),
        comments::Entity::find()
            .filter(comments::Column::ArticleId.eq(article_id))
            .count(db)
    );

    Ok(ArticleStats {
        views: article.views,
        likes: likes? as u64,
        comments: comment_count? as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_zero_is_rejected() {
        let query = ArticleQuery {
            page: 0,
            ..Default::default()
        };
        assert!(matches!(query.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn limit_zero_is_rejected() {
        let query = ArticleQuery {
            limit: 0,
            ..Default::default()
        };
        assert!(matches!(query.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn category_and_slug_are_mutually_exclusive() {
        let query = ArticleQuery {
            category: Some(Category::Fitness),
            slug: Some("intro".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn paginated_variant_requires_query_or_category() {
        let bare = ArticleQuery::default();
        assert!(matches!(
            bare.validate_paginated(),
            Err(ApiError::Validation(_))
        ));

        let with_category = ArticleQuery {
            category: Some(Category::Fitness),
            ..Default::default()
        };
        assert!(with_category.validate_paginated().is_ok());

        let with_query = ArticleQuery {
            query: Some("protein".to_string()),
            ..Default::default()
        };
        assert!(with_query.validate_paginated().is_ok());
    }

    #[test]
    fn tier_and_sort_parsing() {
        assert_eq!(FieldTier::parse("featured"), Some(FieldTier::Featured));
        assert_eq!(FieldTier::parse("dashboard"), Some(FieldTier::Dashboard));
        assert_eq!(FieldTier::parse("full"), Some(FieldTier::Full));
        assert_eq!(FieldTier::parse("everything"), None);
        assert_eq!(SortField::parse("views"), Some(SortField::Views));
        assert_eq!(SortField::parse("title"), None);
    }

    #[test]
    fn featured_view_omits_heavy_fields() {
        let now = Utc::now().naive_utc();
        let article = articles::Model {
            id: 1,
            author_id: 1,
            category: "fitness".to_string(),
            status: articles::STATUS_PUBLISHED.to_string(),
            views: 12,
            images: serde_json::json!(["cover.jpg", "detail.jpg"]),
            created_at: now,
            updated_at: now,
            unpublished_at: None,
        };
        let content = article_contents::Model {
            id: 1,
            article_id: 1,
            position: 0,
            hreflang: "en".to_string(),
            main_title: "Intro".to_string(),
            sections: serde_json::json!([{"sub_title": "s", "paragraphs": ["p"]}]),
            meta_title: "Intro".to_string(),
            meta_description: "d".to_string(),
            keywords: serde_json::json!(["k"]),
            slug: "intro".to_string(),
            url_pattern: "/articles/intro".to_string(),
            canonical_url: "https://example.com/articles/intro".to_string(),
            seo_type: "article".to_string(),
        };

        let featured = build_view(&article, &content, FieldTier::Featured);
        assert!(featured.sections.is_none());
        assert!(featured.views.is_none());
        assert_eq!(featured.image, Some(serde_json::json!("cover.jpg")));

        let dashboard = build_view(&article, &content, FieldTier::Dashboard);
        assert_eq!(dashboard.views, Some(12));
        assert!(dashboard.sections.is_none());

        let full = build_view(&article, &content, FieldTier::Full);
        assert!(full.sections.is_some());
        assert!(full.images.is_some());
        assert_eq!(full.canonical_url.as_deref(), Some("https://example.com/articles/intro"));
    }
}
