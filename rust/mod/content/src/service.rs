use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use catalog::model::{GameVersion, League};
use catalog::service::CatalogService;
use storefront_core::ServiceError;

use crate::cache::{DEFAULT_TTL, QueryCache};
use crate::client::{CmsClient, CmsError, QueryParams};
use crate::image::ImageUrlBuilder;
use crate::model::{
    Post, ProductContent, SitemapData, SitemapLeague, SitemapPost, SitemapProduct,
};
use crate::queries;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_RELATED_LIMIT: u32 = 3;

const POST_TAGS: &[&str] = &["post", "author", "category"];
const PRODUCT_TAGS: &[&str] = &["product"];

/// Blog and product content from the CMS, cached per query.
pub struct ContentService {
    cms: Option<Arc<dyn CmsClient>>,
    cache: QueryCache,
    images: Option<ImageUrlBuilder>,
    catalog: Arc<CatalogService>,
}

fn cms_error(e: CmsError) -> ServiceError {
    match e {
        CmsError::Server { status, message } => ServiceError::Upstream { status, message },
        other => ServiceError::Internal(other.to_string()),
    }
}

fn params(pairs: &[(&str, Value)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

impl ContentService {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self {
            cms: None,
            cache: QueryCache::new(DEFAULT_TTL),
            images: None,
            catalog,
        }
    }

    pub fn with_cms(mut self, cms: Arc<dyn CmsClient>, images: ImageUrlBuilder) -> Self {
        self.cms = Some(cms);
        self.images = Some(images);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = QueryCache::new(ttl);
        self
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: QueryParams,
        tags: &[&str],
    ) -> Result<T, ServiceError> {
        let key = QueryCache::key(query, &params);
        let value = match self.cache.get(&key) {
            Some(v) => v,
            None => {
                let cms = self
                    .cms
                    .as_ref()
                    .ok_or_else(|| ServiceError::Internal("CMS is not configured".into()))?;
                let v = cms.query(query, &params).await.map_err(cms_error)?;
                self.cache.insert(key, v.clone(), tags);
                v
            }
        };
        serde_json::from_value(value).map_err(|e| ServiceError::Internal(format!("cms decode: {e}")))
    }

    /// Fill author image URLs from their asset references.
    fn resolve_images(&self, post: &mut Post) {
        let (Some(images), Some(author)) = (&self.images, post.author.as_mut()) else {
            return;
        };
        let reference = author
            .image
            .as_ref()
            .and_then(|img| img["asset"]["_ref"].as_str());
        if let Some(url) = reference.and_then(|r| images.url(r, None, None)) {
            author.image_url = Some(url);
        }
    }

    pub async fn posts(&self, language: &str) -> Result<Vec<Post>, ServiceError> {
        let mut posts: Vec<Post> = self
            .fetch(&queries::posts(), params(&[("language", language.into())]), POST_TAGS)
            .await?;
        posts.iter_mut().for_each(|p| self.resolve_images(p));
        Ok(posts)
    }

    pub async fn post_by_slug(&self, slug: &str, language: &str) -> Result<Post, ServiceError> {
        let post: Option<Post> = self
            .fetch(
                &queries::post_by_slug(),
                params(&[("slug", slug.into()), ("language", language.into())]),
                POST_TAGS,
            )
            .await?;
        let mut post = post.ok_or_else(|| ServiceError::NotFound(format!("post {slug} not found")))?;
        self.resolve_images(&mut post);
        Ok(post)
    }

    pub async fn posts_by_category(
        &self,
        category_slug: &str,
        game_version: GameVersion,
        language: &str,
    ) -> Result<Vec<Post>, ServiceError> {
        let mut posts: Vec<Post> = self
            .fetch(
                &queries::posts_by_category_and_game(),
                params(&[
                    ("categorySlug", category_slug.into()),
                    ("gameVersion", game_version.as_str().into()),
                    ("language", language.into()),
                ]),
                POST_TAGS,
            )
            .await?;
        posts.iter_mut().for_each(|p| self.resolve_images(p));
        Ok(posts)
    }

    /// Newest posts other than `current_slug`.
    pub async fn related_posts(
        &self,
        current_slug: &str,
        language: &str,
        limit: u32,
    ) -> Result<Vec<Post>, ServiceError> {
        self.fetch(
            queries::RELATED_POSTS,
            params(&[
                ("currentPostSlug", current_slug.into()),
                ("language", language.into()),
                ("limit", limit.into()),
            ]),
            &["post"],
        )
        .await
    }

    pub async fn products(&self) -> Result<Vec<ProductContent>, ServiceError> {
        self.fetch(&queries::products(), QueryParams::new(), PRODUCT_TAGS).await
    }

    pub async fn product_by_slug(&self, slug: &str) -> Result<ProductContent, ServiceError> {
        let product: Option<ProductContent> = self
            .fetch(&queries::product_by_slug(), params(&[("slug", slug.into())]), PRODUCT_TAGS)
            .await?;
        product.ok_or_else(|| ServiceError::NotFound(format!("product content {slug} not found")))
    }

    /// Drop cached results for `tags`.
    pub fn revalidate(&self, tags: &[String]) -> usize {
        self.cache.invalidate(tags)
    }

    /// Posts come from the CMS, products and leagues from the catalog. A CMS
    /// failure yields an empty post list.
    pub async fn sitemap_data(&self) -> Result<SitemapData, ServiceError> {
        let posts = match self.cms {
            Some(_) => self
                .fetch::<Vec<SitemapPost>>(queries::SITEMAP_POSTS, QueryParams::new(), &["post"])
                .await
                .unwrap_or_else(|e| {
                    warn!("sitemap: could not fetch posts: {}", e);
                    Vec::new()
                }),
            None => Vec::new(),
        };

        let products = self
            .catalog
            .list_products(Default::default())?
            .into_iter()
            .map(|p| SitemapProduct {
                updated_at: p.updated_at.or(p.created_at).unwrap_or_default(),
                name: p.name,
                game_version: p.game_version.as_str().to_string(),
                league: p.league,
                difficulty: p.difficulty,
            })
            .collect();

        let leagues = |gv: GameVersion| -> Result<Vec<SitemapLeague>, ServiceError> {
            Ok(self
                .catalog
                .active_leagues(gv)?
                .into_iter()
                .map(|l: League| SitemapLeague {
                    updated_at: l.updated_at.or(l.created_at).unwrap_or_default(),
                    name: l.name,
                    game_version: l.game_version.as_str().to_string(),
                    difficulty: l.difficulty.unwrap_or_default(),
                })
                .collect())
        };

        let data = SitemapData {
            posts,
            products,
            league_poe1: leagues(GameVersion::PathOfExile1)?,
            league_poe2: leagues(GameVersion::PathOfExile2)?,
        };
        debug!(
            posts = data.posts.len(),
            products = data.products.len(),
            "sitemap data assembled"
        );
        Ok(data)
    }
}
