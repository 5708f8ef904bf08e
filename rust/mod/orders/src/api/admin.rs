use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::warn;

use storefront_core::{ListParams, ListResult, ServiceError, permission};

use super::AppState;
use crate::model::{BoardColumn, Order, OrderStatus};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_all))
        .route("/admin/orders/board", get(board))
        .route("/admin/orders/events", get(events))
        .route("/admin/orders/{id}/status", patch(set_status))
        .route("/admin/orders/{id}/advance", post(advance))
}

async fn list_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Order>>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    Ok(Json(state.orders.list_all(&params)?))
}

async fn board(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BoardColumn>>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    Ok(Json(state.orders.board()?))
}

/// Server-sent events: `insert` / `update` with the order as data.
async fn events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    let stream = BroadcastStream::new(state.orders.subscribe()).filter_map(|msg| match msg {
        Ok(change) => Event::default()
            .event(change.kind.as_str())
            .json_data(&change.order)
            .ok()
            .map(Ok),
        Err(e) => {
            warn!("order feed subscriber lagged: {e}");
            None
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
struct StatusBody {
    status: OrderStatus,
}

async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Order>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    Ok(Json(state.orders.set_status(&id, body.status)?))
}

async fn advance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Order>, ServiceError> {
    state.auth.check(&headers, permission::ADMIN)?;
    Ok(Json(state.orders.advance(&id)?))
}
