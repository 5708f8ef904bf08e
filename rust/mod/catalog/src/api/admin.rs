use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, patch, post},
};
use serde::Deserialize;

use storefront_core::ServiceError;

use super::{AppState, parse_game};
use crate::model::{League, NewLeague, NewProduct, Product, ProductFilter};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/catalog/products", post(create_product).get(list_products))
        .route("/admin/catalog/products/{id}", delete(delete_product))
        .route("/admin/catalog/products/{id}/price", patch(update_price))
        .route("/admin/catalog/leagues", get(list_leagues).post(add_league))
        .route(
            "/admin/catalog/leagues/{id}",
            patch(update_league).delete(delete_league),
        )
}

async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ServiceError> {
    state.require_admin(&headers)?;
    Ok(Json(state.svc.list_products(filter)?))
}

async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewProduct>,
) -> Result<Json<Product>, ServiceError> {
    state.require_admin(&headers)?;
    Ok(Json(state.svc.create_product(input)?))
}

#[derive(Deserialize)]
struct PriceBody {
    price: f64,
}

async fn update_price(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PriceBody>,
) -> Result<Json<Product>, ServiceError> {
    state.require_admin(&headers)?;
    Ok(Json(state.svc.update_price(&id, body.price)?))
}

async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.require_admin(&headers)?;
    state.svc.delete_product(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeagueQuery {
    game_version: Option<String>,
}

async fn list_leagues(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<LeagueQuery>,
) -> Result<Json<Vec<League>>, ServiceError> {
    state.require_admin(&headers)?;
    let game = q.game_version.as_deref().map(parse_game).transpose()?;
    Ok(Json(state.svc.list_leagues(game)?))
}

async fn add_league(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewLeague>,
) -> Result<Json<League>, ServiceError> {
    state.require_admin(&headers)?;
    Ok(Json(state.svc.add_league(input)?))
}

async fn update_league(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<League>, ServiceError> {
    state.require_admin(&headers)?;
    Ok(Json(state.svc.update_league(&id, patch)?))
}

async fn delete_league(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.require_admin(&headers)?;
    state.svc.delete_league(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
