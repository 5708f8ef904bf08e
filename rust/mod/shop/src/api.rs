use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, patch, post, put},
};
use serde::{Deserialize, Serialize};

use catalog::service::CatalogService;
use storefront_core::{Authenticator, ServiceError, permission};

use crate::cart::{Cart, CartItem, CartStore};
use crate::currency::{Currency, RateBook, RateSnapshot, format_price};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<CartStore>,
    pub rates: Arc<RateBook>,
    pub catalog: Arc<CatalogService>,
    pub auth: Arc<dyn Authenticator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/currency/rates", get(rates))
        .route("/api/currency/convert", get(convert))
        .route("/api/currency/refresh", post(refresh))
        .route("/api/carts/{id}", get(get_cart).delete(clear_cart))
        .route("/api/carts/{id}/items", post(add_item))
        .route(
            "/api/carts/{id}/items/{product_id}",
            patch(update_item).delete(remove_item),
        )
        .route("/api/carts/{id}/currency", put(set_currency))
        .with_state(state)
}

fn parse_currency(code: &str) -> Result<Currency, ServiceError> {
    Currency::from_code(code)
        .ok_or_else(|| ServiceError::Validation(format!("unsupported currency '{}'", code)))
}

// ── Currency ──

async fn rates(State(state): State<AppState>) -> Json<RateSnapshot> {
    Json(state.rates.snapshot())
}

#[derive(Deserialize)]
struct ConvertQuery {
    amount: f64,
    currency: String,
}

#[derive(Serialize)]
struct Converted {
    amount: f64,
    currency: Currency,
    converted: f64,
    formatted: String,
}

async fn convert(
    State(state): State<AppState>,
    Query(q): Query<ConvertQuery>,
) -> Result<Json<Converted>, ServiceError> {
    let currency = parse_currency(&q.currency)?;
    let converted = state.rates.convert(q.amount, currency);
    Ok(Json(Converted {
        amount: q.amount,
        currency,
        converted,
        formatted: format_price(converted, currency),
    }))
}

async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RateSnapshot>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    Ok(Json(state.rates.refresh().await))
}

// ── Carts ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartView {
    id: String,
    items: Vec<CartItem>,
    currency: Currency,
    total_items: u32,
    total_price: f64,
    formatted_total: String,
}

impl CartView {
    fn new(id: String, cart: Cart) -> Self {
        Self {
            id,
            total_items: cart.total_items(),
            total_price: cart.total_price(),
            formatted_total: format_price(cart.total_price(), cart.currency),
            currency: cart.currency,
            items: cart.items,
        }
    }
}

async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state.carts.get(&id)?;
    Ok(Json(CartView::new(id, cart)))
}

/// Empties the cart; the currency choice survives.
async fn clear_cart(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state.carts.update(&id, |c| {
        c.clear();
        Ok(())
    })?;
    Ok(Json(CartView::new(id, cart)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemBody {
    product_id: String,
    #[serde(default = "one")]
    quantity: u32,
}

fn one() -> u32 {
    1
}

async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddItemBody>,
) -> Result<Json<CartView>, ServiceError> {
    let product = state.catalog.get_product(&body.product_id)?;
    let rates = state.rates.rates();
    let cart = state.carts.update(&id, |c| {
        c.add(product, body.quantity, &rates);
        Ok(())
    })?;
    Ok(Json(CartView::new(id, cart)))
}

#[derive(Deserialize)]
struct QuantityBody {
    quantity: i64,
}

async fn update_item(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(String, String)>,
    Json(body): Json<QuantityBody>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state.carts.update(&id, |c| {
        c.update_quantity(&product_id, body.quantity);
        Ok(())
    })?;
    Ok(Json(CartView::new(id, cart)))
}

async fn remove_item(
    State(state): State<AppState>,
    Path((id, product_id)): Path<(String, String)>,
) -> Result<Json<CartView>, ServiceError> {
    let cart = state.carts.update(&id, |c| {
        c.remove(&product_id);
        Ok(())
    })?;
    Ok(Json(CartView::new(id, cart)))
}

#[derive(Deserialize)]
struct CurrencyBody {
    currency: String,
}

async fn set_currency(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CurrencyBody>,
) -> Result<Json<CartView>, ServiceError> {
    let currency = parse_currency(&body.currency)?;
    let rates = state.rates.rates();
    let cart = state.carts.update(&id, |c| {
        c.set_currency(currency, &rates);
        Ok(())
    })?;
    Ok(Json(CartView::new(id, cart)))
}
