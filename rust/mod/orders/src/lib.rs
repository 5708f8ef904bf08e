//! Orders: records, status board and the realtime change feed.

pub mod api;
pub mod model;
pub mod pricing;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;
use catalog::service::CatalogService;
use shop::currency::RateBook;
use storefront_core::{Authenticator, Module};

use service::OrderService;

pub struct OrdersModule {
    state: api::AppState,
}

impl OrdersModule {
    pub fn new(
        orders: Arc<OrderService>,
        catalog: Arc<CatalogService>,
        rates: Arc<RateBook>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            state: api::AppState {
                orders,
                catalog,
                rates,
                auth,
            },
        }
    }
}

impl Module for OrdersModule {
    fn name(&self) -> &str {
        "orders"
    }

    fn routes(&self) -> Router {
        api::router(self.state.clone())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use catalog::model::{GameVersion, Product};

    use crate::model::OrderItem;

    pub fn order_item(id: &str, quantity: u32, price: f64) -> OrderItem {
        OrderItem {
            product: Product {
                id: id.into(),
                name: format!("Item {}", id),
                category: "currency".into(),
                description: String::new(),
                slug: String::new(),
                alt: None,
                price,
                img_url: "https://cdn.example/item.png".into(),
                game_version: GameVersion::PathOfExile1,
                league: "Settlers".into(),
                difficulty: "softcore".into(),
                created_at: None,
                updated_at: None,
            },
            quantity,
            price_in_currency: price,
        }
    }
}
