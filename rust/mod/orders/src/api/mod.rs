mod admin;
mod customer;

use std::sync::Arc;

use axum::Router;

use catalog::service::CatalogService;
use shop::currency::RateBook;
use storefront_core::Authenticator;

use crate::service::OrderService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub rates: Arc<RateBook>,
    pub auth: Arc<dyn Authenticator>,
}

/// Build the orders router.
///
/// Routes:
/// - `GET    /api/orders`                caller's orders
/// - `POST   /api/orders`                place an order
/// - `GET    /api/orders/{id}`           one order (owner or admin)
/// - `PATCH  /api/orders/update`         partial update (admin)
/// - `GET    /admin/orders`              all orders, paginated
/// - `GET    /admin/orders/board`        orders grouped by status
/// - `GET    /admin/orders/events`       change feed (SSE)
/// - `PATCH  /admin/orders/{id}/status`  set status
/// - `POST   /admin/orders/{id}/advance` move to the next column
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(customer::routes())
        .merge(admin::routes())
        .with_state(state)
}
