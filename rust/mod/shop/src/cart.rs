//! Shopping cart state and its KV persistence.
//!
//! A cart is keyed by an opaque client-chosen id. Every client that presents
//! the same id sees the same cart.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use catalog::model::Product;
use storefront_core::ServiceError;
use storefront_kv::{KVStore, get_json, set_json};

use crate::currency::{Currency, Rates, convert_price, round2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub quantity: u32,
    pub currency: Currency,
    pub price_in_currency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub currency: Currency,
}

impl Default for Cart {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            currency: Currency::Usd,
        }
    }
}

impl Cart {
    /// Add `quantity` of a product. An existing line is incremented and
    /// repriced from the given snapshot.
    pub fn add(&mut self, product: Product, quantity: u32, rates: &Rates) {
        let quantity = quantity.max(1);
        let price = convert_price(product.price, self.currency, rates);
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                item.product = product;
                item.currency = self.currency;
                item.price_in_currency = price;
            }
            None => self.items.push(CartItem {
                product,
                quantity,
                currency: self.currency,
                price_in_currency: price,
            }),
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product.id != product_id);
    }

    /// Set a line's quantity. Anything below 1 removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) {
        if quantity < 1 {
            self.remove(product_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|i| i.product.id == product_id) {
            item.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, i| total.saturating_add(i.quantity))
    }

    /// Sum of line totals in the cart currency.
    pub fn total_price(&self) -> f64 {
        round2(
            self.items
                .iter()
                .map(|i| i.price_in_currency * f64::from(i.quantity))
                .sum(),
        )
    }

    /// Switch the display currency and reprice every line.
    pub fn set_currency(&mut self, currency: Currency, rates: &Rates) {
        self.currency = currency;
        for item in &mut self.items {
            item.currency = currency;
            item.price_in_currency = convert_price(item.product.price, currency, rates);
        }
    }
}

const MAX_CART_ID_LEN: usize = 128;

fn cart_key(id: &str) -> Result<String, ServiceError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_CART_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ServiceError::Validation(format!("invalid cart id '{}'", id)));
    }
    Ok(format!("cart/{}", id))
}

/// Carts stored in the KV store under `cart/<id>`.
pub struct CartStore {
    kv: Arc<dyn KVStore>,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl CartStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Load a cart. Unknown ids yield an empty USD cart.
    pub fn get(&self, id: &str) -> Result<Cart, ServiceError> {
        let key = cart_key(id)?;
        let cart = get_json::<Cart>(self.kv.as_ref(), &key)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(cart.unwrap_or_default())
    }

    /// Apply `f` to the stored cart and save the result.
    pub fn update<F>(&self, id: &str, f: F) -> Result<Cart, ServiceError>
    where
        F: FnOnce(&mut Cart) -> Result<(), ServiceError>,
    {
        let key = cart_key(id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cart = get_json::<Cart>(self.kv.as_ref(), &key)
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .unwrap_or_default();
        f(&mut cart)?;
        set_json(self.kv.as_ref(), &key, &cart).map_err(|e| ServiceError::Storage(e.to_string()))?;
        debug!(cart = id, items = cart.items.len(), "cart saved");
        Ok(cart)
    }

    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let key = cart_key(id)?;
        self.kv
            .delete(&key)
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use catalog::model::GameVersion;
    use storefront_kv::RedbStore;

    use super::*;

    fn product(id: &str, price: f64) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {}", id),
            category: "currency".into(),
            description: String::new(),
            slug: String::new(),
            alt: None,
            price,
            img_url: "https://cdn.example/p.png".into(),
            game_version: GameVersion::PathOfExile1,
            league: "Settlers".into(),
            difficulty: "softcore".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn rates() -> Rates {
        Rates::new(BTreeMap::from([
            (Currency::Eur, 0.5),
            (Currency::Gbp, 0.8),
            (Currency::Brl, 5.0),
        ]))
    }

    #[test]
    fn adding_increases_total_by_converted_price() {
        let rates = rates();
        let mut cart = Cart::default();
        cart.set_currency(Currency::Eur, &rates);
        let before = cart.total_price();
        cart.add(product("a", 3.0), 2, &rates);
        assert_eq!(cart.total_price() - before, 3.0);
        assert_eq!(cart.items[0].price_in_currency, 1.5);
        assert_eq!(cart.items[0].currency, Currency::Eur);
    }

    #[test]
    fn adding_same_product_merges_lines() {
        let rates = rates();
        let mut cart = Cart::default();
        cart.add(product("a", 1.0), 1, &rates);
        cart.add(product("a", 2.0), 3, &rates);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_items(), 4);
        // Repriced from the newest snapshot.
        assert_eq!(cart.total_price(), 8.0);
    }

    #[test]
    fn huge_quantities_saturate() {
        let rates = rates();
        let mut cart = Cart::default();
        cart.add(product("a", 1.0), u32::MAX, &rates);
        cart.add(product("a", 1.0), 1, &rates);
        assert_eq!(cart.items[0].quantity, u32::MAX);
        cart.add(product("b", 1.0), 5, &rates);
        assert_eq!(cart.total_items(), u32::MAX);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let rates = rates();
        let mut cart = Cart::default();
        cart.add(product("a", 1.0), 1, &rates);
        cart.add(product("b", 1.0), 1, &rates);
        cart.update_quantity("a", 5);
        assert_eq!(cart.total_items(), 6);
        cart.update_quantity("a", 0);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product.id, "b");
        cart.update_quantity("b", -3);
        assert!(cart.items.is_empty());
    }

    #[test]
    fn currency_switch_reprices_everything() {
        let rates = rates();
        let mut cart = Cart::default();
        cart.add(product("a", 2.0), 1, &rates);
        cart.add(product("b", 4.0), 2, &rates);
        assert_eq!(cart.total_price(), 10.0);

        cart.set_currency(Currency::Brl, &rates);
        assert!(cart.items.iter().all(|i| i.currency == Currency::Brl));
        assert_eq!(cart.total_price(), 50.0);

        cart.clear();
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_price(), 0.0);
    }

    #[test]
    fn store_shares_cart_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> = Arc::new(RedbStore::open(&dir.path().join("kv.redb")).unwrap());
        let store = CartStore::new(kv.clone());
        let rates = rates();

        store
            .update("tab-1", |c| {
                c.add(product("a", 1.0), 2, &rates);
                Ok(())
            })
            .unwrap();

        // A second handle on the same storage sees the same cart.
        let other = CartStore::new(kv);
        assert_eq!(other.get("tab-1").unwrap().total_items(), 2);
        assert_eq!(other.get("unknown").unwrap(), Cart::default());

        store.delete("tab-1").unwrap();
        assert!(other.get("tab-1").unwrap().items.is_empty());
    }

    #[test]
    fn cart_ids_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let store = CartStore::new(Arc::new(RedbStore::open(&dir.path().join("kv.redb")).unwrap()));
        assert!(matches!(store.get(""), Err(ServiceError::Validation(_))));
        assert!(matches!(store.get("../etc"), Err(ServiceError::Validation(_))));
        assert!(matches!(store.get(&"x".repeat(200)), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn cart_item_flattens_product() {
        let item = CartItem {
            product: product("a", 1.0),
            quantity: 1,
            currency: Currency::Gbp,
            price_in_currency: 0.8,
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["id"], "a");
        assert_eq!(v["priceInCurrency"], 0.8);
        assert_eq!(v["currency"], "GBP");
    }
}
