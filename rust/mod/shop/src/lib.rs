//! Shop: multi-currency pricing and the server-held shopping cart.

pub mod api;
pub mod cart;
pub mod currency;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use catalog::service::CatalogService;
use storefront_core::{Authenticator, Module};

use cart::CartStore;
use currency::RateBook;

pub struct ShopModule {
    carts: Arc<CartStore>,
    rates: Arc<RateBook>,
    catalog: Arc<CatalogService>,
    auth: Arc<dyn Authenticator>,
}

impl ShopModule {
    pub fn new(
        carts: Arc<CartStore>,
        rates: Arc<RateBook>,
        catalog: Arc<CatalogService>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self { carts, rates, catalog, auth }
    }
}

impl Module for ShopModule {
    fn name(&self) -> &str {
        "shop"
    }

    fn routes(&self) -> Router {
        api::router(api::AppState {
            carts: self.carts.clone(),
            rates: self.rates.clone(),
            catalog: self.catalog.clone(),
            auth: self.auth.clone(),
        })
    }
}
