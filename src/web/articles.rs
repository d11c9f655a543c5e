//! Article endpoints: lookups, listings and admin CRUD

use crate::articles::{self, ArticleQuery, FieldTier, SortField};
use crate::category::{self, Category};
use crate::locale::Locale;
use crate::middleware::ClientCtx;
use crate::orm::{article_contents, articles as articles_orm};
use crate::web::error::{ApiError, ApiResult};
use actix_web::{delete, get, patch, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{entity::*, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, TransactionTrait};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(list_articles)
        .service(list_paginated)
        .service(dashboard)
        .service(get_by_slug)
        .service(get_by_category)
        .service(get_stats)
        .service(increment_views)
        .service(toggle_like)
        .service(get_by_id)
        .service(create_article)
        .service(update_article)
        .service(archive_article);
}

/// Listing query parameters. The camelCase names mirror the public API.
#[derive(Deserialize)]
struct ListParams {
    page: Option<u64>,
    limit: Option<u64>,
    sort: Option<String>,
    order: Option<String>,
    locale: Option<String>,
    category: Option<String>,
    slug: Option<String>,
    query: Option<String>,
    /// JSON array of article ids, e.g. `excludeIds=[3,5]`.
    #[serde(rename = "excludeIds")]
    exclude_ids: Option<String>,
    fields: Option<String>,
    #[serde(rename = "skipCount")]
    skip_count: Option<bool>,
}

impl ListParams {
    /// Parse and validate raw parameters into a service query.
    fn into_query(self, client: &ClientCtx) -> ApiResult<ArticleQuery> {
        let locale = self
            .locale
            .as_deref()
            .map(Locale::parse_or_default)
            .unwrap_or_default();

        let sort = match self.sort.as_deref() {
            Some(raw) => SortField::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("Unknown sort field: {}", raw)))?,
            None => SortField::CreatedAt,
        };

        let order = match self.order.as_deref() {
            None | Some("desc") => Order::Desc,
            Some("asc") => Order::Asc,
            Some(raw) => {
                return Err(ApiError::Validation(format!(
                    "order must be asc or desc, got {}",
                    raw
                )))
            }
        };

        // Localized category names are accepted alongside canonical values.
        let category = match self.category.as_deref() {
            Some(raw) => Some(
                category::from_localized(raw, locale)
                    .ok_or_else(|| ApiError::Validation(format!("Unknown category: {}", raw)))?,
            ),
            None => None,
        };

        let fields = match self.fields.as_deref() {
            Some(raw) => FieldTier::parse(raw)
                .ok_or_else(|| ApiError::Validation(format!("Unknown fields tier: {}", raw)))?,
            None => FieldTier::Featured,
        };
        if fields == FieldTier::Dashboard {
            client.require_admin()?;
        }

        let exclude_ids = match self.exclude_ids.as_deref() {
            Some(raw) => serde_json::from_str::<Vec<i32>>(raw).map_err(|_| {
                ApiError::Validation("excludeIds must be a JSON array of ids".to_string())
            })?,
            None => Vec::new(),
        };

        let query = ArticleQuery {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(articles::DEFAULT_PAGE_SIZE),
            sort,
            order,
            locale,
            category,
            slug: self.slug,
            query: self.query,
            exclude_ids,
            fields,
            skip_count: self.skip_count.unwrap_or(false),
        };
        query.validate()?;
        Ok(query)
    }
}

/// Default listing: latest published articles.
#[get("/articles")]
async fn list_articles(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    params: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    let query = params.into_inner().into_query(&client)?;
    let page = articles::list(&db, &query).await?;
    Ok(super::ok_data(page))
}

/// Search/category listing. Requires `query` or `category`.
#[get("/articles/paginated")]
async fn list_paginated(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    params: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    let query = params.into_inner().into_query(&client)?;
    query.validate_paginated()?;
    let page = articles::list(&db, &query).await?;
    Ok(super::ok_data(page))
}

/// Admin dashboard listing over every status.
#[get("/articles/dashboard")]
async fn dashboard(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    params: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    client.require_admin()?;
    let mut query = params.into_inner().into_query(&client)?;
    query.fields = FieldTier::Dashboard;
    let page = articles::list(&db, &query).await?;
    Ok(super::ok_data(page))
}

#[derive(Deserialize)]
struct LocaleParam {
    locale: Option<String>,
}

impl LocaleParam {
    fn locale(&self) -> Locale {
        self.locale
            .as_deref()
            .map(Locale::parse_or_default)
            .unwrap_or_default()
    }
}

/// Fetch one published article by the slug of any language block.
#[get("/articles/slug/{slug}")]
async fn get_by_slug(
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    params: web::Query<LocaleParam>,
) -> ApiResult<HttpResponse> {
    let view = articles::find_by_slug(&db, &path.into_inner(), params.locale()).await?;
    Ok(super::ok_data(view))
}

/// Category listing; the category segment may be localized.
#[get("/articles/category/{category}")]
async fn get_by_category(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<String>,
    params: web::Query<ListParams>,
) -> ApiResult<HttpResponse> {
    let mut params = params.into_inner();
    params.category = Some(path.into_inner());
    params.slug = None;
    let query = params.into_query(&client)?;
    let page = articles::list(&db, &query).await?;
    Ok(super::ok_data(page))
}

#[get("/articles/{id}/stats")]
async fn get_stats(db: web::Data<DatabaseConnection>, path: web::Path<i32>) -> ApiResult<HttpResponse> {
    let stats = articles::stats(&db, path.into_inner()).await?;
    Ok(super::ok_data(stats))
}

/// Count a view. Deliberately unauthenticated and undeduplicated.
#[post("/articles/{id}/views")]
async fn increment_views(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    articles::increment_views(&db, path.into_inner()).await?;
    Ok(super::ok_message("View counted"))
}

#[post("/articles/{id}/like")]
async fn toggle_like(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let user = client.require_user()?;
    let status = articles::toggle_like(&db, path.into_inner(), user.id).await?;
    Ok(super::ok_data(status))
}

#[get("/articles/{id}")]
async fn get_by_id(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    params: web::Query<LocaleParam>,
) -> ApiResult<HttpResponse> {
    let view = articles::find_by_id(
        &db,
        path.into_inner(),
        params.locale(),
        FieldTier::Full,
        client.is_admin(),
    )
    .await?;
    Ok(super::ok_data(view))
}

#[derive(Deserialize, Validate)]
struct SeoInput {
    #[validate(length(min = 1, max = 255))]
    meta_title: String,
    #[validate(length(max = 500))]
    meta_description: String,
    keywords: Vec<String>,
    #[validate(length(min = 1, max = 255))]
    slug: String,
    hreflang: String,
    url_pattern: String,
    canonical_url: String,
    #[serde(rename = "type")]
    seo_type: String,
}

#[derive(Deserialize, serde::Serialize, Validate)]
struct SectionInput {
    sub_title: String,
    paragraphs: Vec<String>,
}

#[derive(Deserialize, Validate)]
struct ContentBlockInput {
    #[validate(length(min = 1, max = 255))]
    main_title: String,
    #[validate]
    sections: Vec<SectionInput>,
    #[validate]
    seo: SeoInput,
}

#[derive(Deserialize, Validate)]
struct CreateArticleForm {
    category: String,
    status: Option<String>,
    images: Option<Vec<String>>,
    #[validate]
    contents: Vec<ContentBlockInput>,
}

#[derive(Deserialize, Validate)]
struct UpdateArticleForm {
    category: Option<String>,
    status: Option<String>,
    images: Option<Vec<String>>,
    #[validate]
    contents: Option<Vec<ContentBlockInput>>,
}

fn parse_status(raw: &str) -> ApiResult<&'static str> {
    match raw {
        "published" => Ok(articles_orm::STATUS_PUBLISHED),
        "archived" => Ok(articles_orm::STATUS_ARCHIVED),
        _ => Err(ApiError::Validation(format!("Unknown status: {}", raw))),
    }
}

/// Check block-level invariants: hreflang in the supported set, slugs
/// unique within the payload.
fn validate_blocks(contents: &[ContentBlockInput]) -> ApiResult<()> {
    if contents.is_empty() {
        return Err(ApiError::Validation(
            "An article needs at least one language block".to_string(),
        ));
    }

    let mut slugs: Vec<&str> = Vec::new();
    for block in contents {
        if Locale::parse(&block.seo.hreflang).is_none() {
            return Err(ApiError::Validation(format!(
                "Unsupported hreflang: {}",
                block.seo.hreflang
            )));
        }
        if slugs.contains(&block.seo.slug.as_str()) {
            return Err(ApiError::Validation(format!(
                "Duplicate slug in payload: {}",
                block.seo.slug
            )));
        }
        slugs.push(&block.seo.slug);
    }
    Ok(())
}

fn content_model(
    article_id: i32,
    position: i32,
    block: &ContentBlockInput,
) -> article_contents::ActiveModel {
    article_contents::ActiveModel {
        article_id: Set(article_id),
        position: Set(position),
        hreflang: Set(block.seo.hreflang.to_lowercase()),
        main_title: Set(block.main_title.clone()),
        sections: Set(serde_json::json!(block.sections)),
        meta_title: Set(block.seo.meta_title.clone()),
        meta_description: Set(block.seo.meta_description.clone()),
        keywords: Set(serde_json::json!(block.seo.keywords)),
        slug: Set(block.seo.slug.clone()),
        url_pattern: Set(block.seo.url_pattern.clone()),
        canonical_url: Set(block.seo.canonical_url.clone()),
        seo_type: Set(block.seo.seo_type.clone()),
        ..Default::default()
    }
}

/// Create an article with its language blocks. Admin only.
#[post("/articles")]
async fn create_article(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Json<CreateArticleForm>,
) -> ApiResult<HttpResponse> {
    let admin = client.require_admin()?;

    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    validate_blocks(&form.contents)?;

    let category = Category::parse(&form.category)
        .ok_or_else(|| ApiError::Validation(format!("Unknown category: {}", form.category)))?;
    let status = match form.status.as_deref() {
        Some(raw) => parse_status(raw)?,
        None => articles_orm::STATUS_PUBLISHED,
    };

    // Conflict check up front; the unique index on the slug column backs it
    // against concurrent creates.
    let slugs: Vec<String> = form.contents.iter().map(|b| b.seo.slug.clone()).collect();
    let taken = articles::slugs_in_use(&db, &slugs).await?;
    if !taken.is_empty() {
        return Err(ApiError::Conflict(format!(
            "Slug already in use: {}",
            taken.join(", ")
        )));
    }

    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let article = articles_orm::ActiveModel {
        author_id: Set(admin.id),
        category: Set(category.as_str().to_string()),
        status: Set(status.to_string()),
        views: Set(0),
        images: Set(serde_json::json!(form.images.clone().unwrap_or_default())),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let result = articles_orm::Entity::insert(article).exec(&txn).await?;
    let article_id = result.last_insert_id;

    for (position, block) in form.contents.iter().enumerate() {
        article_contents::Entity::insert(content_model(article_id, position as i32, block))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    log::info!("Article {} created by admin {}", article_id, admin.id);

    let view = articles::find_by_id(&db, article_id, Locale::En, FieldTier::Full, true).await?;
    Ok(super::created_data(view))
}

/// Edit scalar fields and optionally replace the language blocks. Admin
/// only.
#[patch("/articles/{id}")]
async fn update_article(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
    form: web::Json<UpdateArticleForm>,
) -> ApiResult<HttpResponse> {
    let admin = client.require_admin()?;
    let article_id = path.into_inner();

    form.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let article = articles_orm::Entity::find_by_id(article_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    if let Some(contents) = form.contents.as_deref() {
        validate_blocks(contents)?;

        // Slugs taken by other articles conflict; this article's own rows
        // are being replaced and don't count.
        let slugs: Vec<String> = contents.iter().map(|b| b.seo.slug.clone()).collect();
        let own: Vec<String> = articles::load_contents(db.get_ref(), article_id)
            .await?
            .into_iter()
            .map(|c| c.slug)
            .collect();
        let taken: Vec<String> = articles::slugs_in_use(&db, &slugs)
            .await?
            .into_iter()
            .filter(|s| !own.contains(s))
            .collect();
        if !taken.is_empty() {
            return Err(ApiError::Conflict(format!(
                "Slug already in use: {}",
                taken.join(", ")
            )));
        }
    }

    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let was_published = article.status == articles_orm::STATUS_PUBLISHED;
    let mut model: articles_orm::ActiveModel = article.into();

    if let Some(raw) = form.category.as_deref() {
        let category = Category::parse(raw)
            .ok_or_else(|| ApiError::Validation(format!("Unknown category: {}", raw)))?;
        model.category = Set(category.as_str().to_string());
    }
    if let Some(raw) = form.status.as_deref() {
        let status = parse_status(raw)?;
        model.status = Set(status.to_string());
        if status == articles_orm::STATUS_ARCHIVED && was_published {
            model.unpublished_at = Set(Some(now));
        }
    }
    if let Some(images) = form.images.clone() {
        model.images = Set(serde_json::json!(images));
    }
    model.updated_at = Set(now);
    model.update(&txn).await?;

    if let Some(contents) = form.contents.as_deref() {
        article_contents::Entity::delete_many()
            .filter(article_contents::Column::ArticleId.eq(article_id))
            .exec(&txn)
            .await?;
        for (position, block) in contents.iter().enumerate() {
            article_contents::Entity::insert(content_model(article_id, position as i32, block))
                .exec(&txn)
                .await?;
        }
    }

    txn.commit().await?;

    log::info!("Article {} updated by admin {}", article_id, admin.id);

    let view = articles::find_by_id(&db, article_id, Locale::En, FieldTier::Full, true).await?;
    Ok(super::ok_data(view))
}

/// Archive an article (soft delete). Admin only.
#[delete("/articles/{id}")]
async fn archive_article(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let admin = client.require_admin()?;
    let article_id = path.into_inner();

    let article = articles_orm::Entity::find_by_id(article_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Article not found".to_string()))?;

    let mut model: articles_orm::ActiveModel = article.into();
    model.status = Set(articles_orm::STATUS_ARCHIVED.to_string());
    model.unpublished_at = Set(Some(Utc::now().naive_utc()));
    model.updated_at = Set(Utc::now().naive_utc());
    model.update(db.get_ref()).await?;

    log::info!("Article {} archived by admin {}", article_id, admin.id);

    Ok(super::ok_message("Article archived"))
}
