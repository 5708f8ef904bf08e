use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::info;

use shop::currency::Currency;
use storefront_core::{ServiceError, permission};

use super::AppState;
use crate::model::{NewOrder, Order, OrderUpdate};
use crate::pricing::{LineRequest, price_lines};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_mine).post(place_order))
        .route("/api/orders/update", patch(update_order))
        .route("/api/orders/{id}", get(get_order))
}

async fn list_mine(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ServiceError> {
    let claims = state.auth.check(&headers, permission::CUSTOMER)?;
    Ok(Json(state.orders.list_for_user(&claims.sub)?))
}

#[derive(Deserialize)]
struct PlaceOrderBody {
    #[serde(alias = "characterName")]
    character_name: String,
    #[serde(default = "default_currency")]
    currency: String,
    items: Vec<LineRequest>,
}

fn default_currency() -> String {
    "USD".into()
}

async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PlaceOrderBody>,
) -> Result<Json<Order>, ServiceError> {
    let claims = state.auth.check(&headers, permission::CUSTOMER)?;
    let currency = Currency::from_code(&body.currency)
        .ok_or_else(|| ServiceError::Validation(format!("unsupported currency '{}'", body.currency)))?;
    let (items, total_amount) =
        price_lines(&state.catalog, &state.rates.rates(), currency, &body.items)?;
    let order = state.orders.create(NewOrder {
        character_name: body.character_name,
        email: claims.email.unwrap_or_default(),
        items,
        total_amount,
        currency: currency.as_str().to_string(),
        user_id: claims.sub,
    })?;
    Ok(Json(order))
}

/// Owners and admins only; anyone else gets 404.
async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Order>, ServiceError> {
    let claims = state.auth.check(&headers, permission::CUSTOMER)?;
    let order = state.orders.get(&id)?;
    if order.user_id != claims.sub && !claims.is_admin() {
        return Err(ServiceError::NotFound(format!("order {id} not found")));
    }
    Ok(Json(order))
}

#[derive(Deserialize)]
struct UpdateBody {
    #[serde(rename = "orderId")]
    order_id: Option<String>,
    #[serde(flatten)]
    update: OrderUpdate,
}

async fn update_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Order>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    let order_id = body
        .order_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServiceError::Validation("Order ID is required".into()))?;
    let order = state.orders.apply_update(&order_id, body.update)?;
    info!(order = %order.id, status = %order.status, "order updated via api");
    Ok(Json(order))
}
