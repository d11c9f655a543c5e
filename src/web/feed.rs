//! RSS feed of the latest published articles

use crate::config::AppConfig;
use crate::locale::{resolve_content, Locale};
use crate::orm::{article_contents, articles};
use actix_web::{get, web, HttpResponse, Responder};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};
use sea_orm::{
    entity::*, query::*, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::collections::HashMap;

const FEED_ITEM_LIMIT: u64 = 25;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(articles_feed);
}

#[derive(Deserialize)]
struct FeedParams {
    locale: Option<String>,
}

/// RSS feed of the latest published articles, locale-resolved.
#[get("/feed.rss")]
async fn articles_feed(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    params: web::Query<FeedParams>,
) -> impl Responder {
    let locale = params
        .locale
        .as_deref()
        .map(Locale::parse_or_default)
        .unwrap_or_default();

    let rows = match articles::Entity::find()
        .filter(articles::Column::Status.eq(articles::STATUS_PUBLISHED))
        .order_by_desc(articles::Column::CreatedAt)
        .limit(FEED_ITEM_LIMIT)
        .all(db.get_ref())
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("Failed to fetch articles for feed: {}", e);
            return HttpResponse::InternalServerError().body("Failed to generate feed");
        }
    };

    let ids: Vec<i32> = rows.iter().map(|a| a.id).collect();
    let contents = match article_contents::Entity::find()
        .filter(article_contents::Column::ArticleId.is_in(ids))
        .order_by_asc(article_contents::Column::Position)
        .all(db.get_ref())
        .await
    {
        Ok(contents) => contents,
        Err(e) => {
            log::error!("Failed to fetch article contents for feed: {}", e);
            return HttpResponse::InternalServerError().body("Failed to generate feed");
        }
    };

    let mut grouped: HashMap<i32, Vec<article_contents::Model>> = HashMap::new();
    for content in contents {
        grouped.entry(content.article_id).or_default().push(content);
    }

    let mut items = Vec::new();
    for article in &rows {
        let blocks = grouped.remove(&article.id).unwrap_or_default();
        let content = match resolve_content(&blocks, None, locale) {
            Some(content) => content,
            None => continue,
        };

        let link = format!("{}/articles/{}", config.base_url, content.slug);
        let guid = GuidBuilder::default()
            .value(link.clone())
            .permalink(true)
            .build();

        let item = ItemBuilder::default()
            .title(Some(content.main_title.clone()))
            .link(Some(link))
            .description(Some(content.meta_description.clone()))
            .pub_date(Some(
                article
                    .created_at
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string(),
            ))
            .guid(Some(guid))
            .build();

        items.push(item);
    }

    let channel = ChannelBuilder::default()
        .title("Vitablog - Latest Articles")
        .link(config.base_url.clone())
        .description("Latest articles from Vitablog")
        .items(items)
        .build();

    HttpResponse::Ok()
        .content_type("application/rss+xml; charset=utf-8")
        .body(channel.to_string())
}
