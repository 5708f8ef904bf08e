use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use storefront_core::ServiceError;

use super::{AppState, parse_game};
use crate::model::{Difficulty, League, Product, ProductFilter};
use crate::slug::product_url;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/products/by-name/{slug}", get(get_by_name))
        .route("/api/categories", get(categories))
        .route("/api/games/{game}/leagues", get(active_leagues))
        .route("/api/games/{game}/difficulties", get(difficulties))
        .route(
            "/api/games/{game}/leagues/{league}/{difficulty}/products",
            get(products_for),
        )
}

async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ServiceError> {
    Ok(Json(state.svc.list_products(filter)?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ServiceError> {
    Ok(Json(state.svc.get_product(&id)?))
}

#[derive(Deserialize)]
struct ByNameQuery {
    league: Option<String>,
    difficulty: Option<String>,
}

#[derive(Serialize)]
struct ProductPage {
    product: Product,
    url: String,
}

async fn get_by_name(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(q): Query<ByNameQuery>,
) -> Result<Json<ProductPage>, ServiceError> {
    let product = state
        .svc
        .get_product_by_slug(&slug, q.league.as_deref(), q.difficulty.as_deref())?;
    let url = product_url(&product.name, q.league.as_deref(), q.difficulty.as_deref());
    Ok(Json(ProductPage { product, url }))
}

async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ServiceError> {
    Ok(Json(state.svc.categories()?))
}

async fn active_leagues(
    State(state): State<AppState>,
    Path(game): Path<String>,
) -> Result<Json<Vec<League>>, ServiceError> {
    Ok(Json(state.svc.active_leagues(parse_game(&game)?)?))
}

async fn difficulties(
    State(state): State<AppState>,
    Path(game): Path<String>,
) -> Result<Json<Vec<Difficulty>>, ServiceError> {
    Ok(Json(state.svc.difficulties(parse_game(&game)?)?))
}

async fn products_for(
    State(state): State<AppState>,
    Path((game, league, difficulty)): Path<(String, String, String)>,
) -> Result<Json<Vec<Product>>, ServiceError> {
    let game = parse_game(&game)?;
    Ok(Json(state.svc.products_for(game, &league, &difficulty)?))
}
