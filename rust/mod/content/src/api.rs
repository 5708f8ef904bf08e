use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use catalog::model::GameVersion;
use storefront_core::{Authenticator, ServiceError, permission};

use crate::model::{Post, ProductContent, SitemapData};
use crate::service::{ContentService, DEFAULT_LANGUAGE, DEFAULT_RELATED_LIMIT};

#[derive(Clone)]
pub struct AppState {
    pub svc: Arc<ContentService>,
    pub auth: Arc<dyn Authenticator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/blog/posts", get(list_posts))
        .route("/api/blog/posts/{slug}", get(get_post))
        .route("/api/blog/posts/{slug}/related", get(related_posts))
        .route("/api/blog/categories/{category}/{game}", get(posts_by_category))
        .route("/api/content/products", get(list_products))
        .route("/api/content/products/{slug}", get(get_product))
        .route("/api/sitemap-data", get(sitemap_data))
        .route("/admin/content/revalidate", post(revalidate))
        .with_state(state)
}

#[derive(Deserialize)]
struct LanguageQuery {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

impl LanguageQuery {
    fn language(&self) -> &str {
        self.language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

async fn list_posts(
    State(state): State<AppState>,
    Query(q): Query<LanguageQuery>,
) -> Result<Json<Vec<Post>>, ServiceError> {
    Ok(Json(state.svc.posts(q.language()).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<LanguageQuery>,
) -> Result<Json<Post>, ServiceError> {
    Ok(Json(state.svc.post_by_slug(&slug, q.language()).await?))
}

async fn related_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<LanguageQuery>,
) -> Result<Json<Vec<Post>>, ServiceError> {
    let limit = q.limit.unwrap_or(DEFAULT_RELATED_LIMIT);
    Ok(Json(state.svc.related_posts(&slug, q.language(), limit).await?))
}

async fn posts_by_category(
    State(state): State<AppState>,
    Path((category, game)): Path<(String, String)>,
    Query(q): Query<LanguageQuery>,
) -> Result<Json<Vec<Post>>, ServiceError> {
    let game = GameVersion::from_str(&game)
        .ok_or_else(|| ServiceError::Validation(format!("unknown game version '{}'", game)))?;
    Ok(Json(state.svc.posts_by_category(&category, game, q.language()).await?))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductContent>>, ServiceError> {
    Ok(Json(state.svc.products().await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductContent>, ServiceError> {
    Ok(Json(state.svc.product_by_slug(&slug).await?))
}

async fn sitemap_data(State(state): State<AppState>) -> Result<Json<SitemapData>, ServiceError> {
    Ok(Json(state.svc.sitemap_data().await?))
}

#[derive(Deserialize)]
struct RevalidateBody {
    tags: Vec<String>,
}

#[derive(Serialize)]
struct Revalidated {
    revalidated: usize,
    tags: Vec<String>,
}

async fn revalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RevalidateBody>,
) -> Result<Json<Revalidated>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    if body.tags.is_empty() {
        return Err(ServiceError::Validation("tags must not be empty".into()));
    }
    let revalidated = state.svc.revalidate(&body.tags);
    Ok(Json(Revalidated {
        revalidated,
        tags: body.tags,
    }))
}
