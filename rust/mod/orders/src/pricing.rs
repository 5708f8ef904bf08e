//! Turns requested lines into priced order items.
//!
//! Lines whose product is still in the catalog are repriced from it. A line
//! for a product that has since left the catalog keeps the product snapshot
//! it was submitted with. Either way the USD price is converted into the
//! order currency with the current rate snapshot.

use serde::Deserialize;
use serde_json::{Map, Value};

use catalog::model::Product;
use catalog::service::CatalogService;
use shop::currency::{Currency, Rates, convert_price, round2};
use storefront_core::ServiceError;

use crate::model::OrderItem;

/// A requested line. Cart items can be posted as-is: their `id` field is
/// accepted as the product id and the remaining product fields are kept as
/// the submitted snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct LineRequest {
    #[serde(rename = "productId", alias = "product_id", alias = "id")]
    pub product_id: String,
    pub quantity: u32,
    #[serde(flatten)]
    pub submitted: Map<String, Value>,
}

impl LineRequest {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            submitted: Map::new(),
        }
    }

    /// The product as the client sent it, if the snapshot is complete.
    fn submitted_product(&self) -> Option<Product> {
        let mut fields = self.submitted.clone();
        fields.insert("id".into(), Value::String(self.product_id.clone()));
        serde_json::from_value::<Product>(Value::Object(fields))
            .ok()
            .filter(|p| p.price.is_finite() && p.price >= 0.0)
    }
}

fn resolve_product(catalog: &CatalogService, line: &LineRequest) -> Result<Product, ServiceError> {
    match catalog.get_product(&line.product_id) {
        Ok(product) => Ok(product),
        Err(ServiceError::NotFound(_)) => line.submitted_product().ok_or_else(|| {
            ServiceError::Validation(format!("Unknown product {}", line.product_id))
        }),
        Err(e) => Err(e),
    }
}

/// Priced items and their total in `currency`.
pub fn price_lines(
    catalog: &CatalogService,
    rates: &Rates,
    currency: Currency,
    lines: &[LineRequest],
) -> Result<(Vec<OrderItem>, f64), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::Validation("No items provided".into()));
    }
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(ServiceError::Validation(format!(
                "quantity for {} must be at least 1",
                line.product_id
            )));
        }
        let product = resolve_product(catalog, line)?;
        let price_in_currency = convert_price(product.price, currency, rates);
        items.push(OrderItem {
            product,
            quantity: line.quantity,
            price_in_currency,
        });
    }
    let total = round2(items.iter().map(OrderItem::line_total).sum());
    Ok((items, total))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use catalog::model::NewProduct;
    use storefront_sql::SqliteStore;

    use super::*;

    fn catalog_with(price: f64) -> (CatalogService, String) {
        let svc = CatalogService::new(Arc::new(SqliteStore::open_in_memory().unwrap())).unwrap();
        let p = svc
            .create_product(NewProduct {
                name: "Chaos Orb".into(),
                category: "currency".into(),
                description: String::new(),
                slug: None,
                alt: None,
                price,
                img_url: "https://cdn.example/chaos.png".into(),
                game_version: "path-of-exile-1".into(),
                league: "Settlers".into(),
                difficulty: "softcore".into(),
            })
            .unwrap();
        (svc, p.id)
    }

    #[test]
    fn prices_come_from_catalog_in_order_currency() {
        let (catalog, id) = catalog_with(2.0);
        let lines: Vec<LineRequest> = serde_json::from_value(serde_json::json!([
            {"id": id, "quantity": 3, "price": 0.01}
        ]))
        .unwrap();
        let (items, total) = price_lines(&catalog, &Rates::fallback(), Currency::Gbp, &lines).unwrap();
        assert_eq!(items[0].price_in_currency, 1.58);
        assert_eq!(total, 4.74);
    }

    #[test]
    fn rejects_empty_zero_and_unknown() {
        let (catalog, id) = catalog_with(1.0);
        let rates = Rates::fallback();
        assert!(matches!(
            price_lines(&catalog, &rates, Currency::Usd, &[]),
            Err(ServiceError::Validation(m)) if m == "No items provided"
        ));
        let zero = [LineRequest::new(id, 0)];
        assert!(price_lines(&catalog, &rates, Currency::Usd, &zero).is_err());
        let unknown = [LineRequest::new("nope", 1)];
        assert!(matches!(
            price_lines(&catalog, &rates, Currency::Usd, &unknown),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn removed_products_keep_the_submitted_snapshot() {
        let (catalog, _) = catalog_with(1.0);
        let lines: Vec<LineRequest> = serde_json::from_value(serde_json::json!([{
            "id": "retired",
            "quantity": 2,
            "name": "Mirror Shard",
            "category": "currency",
            "price": 10.0,
            "imgUrl": "https://cdn.example/shard.png",
            "gameVersion": "path-of-exile-2",
            "league": "Dawn",
            "difficulty": "hardcore",
            "priceInCurrency": 9.3,
        }]))
        .unwrap();
        let (items, total) = price_lines(&catalog, &Rates::fallback(), Currency::Eur, &lines).unwrap();
        assert_eq!(items[0].product.id, "retired");
        assert_eq!(items[0].product.name, "Mirror Shard");
        assert_eq!(items[0].price_in_currency, 9.3);
        assert_eq!(total, 18.6);

        // Catalog price wins over a submitted one when the product exists.
        let (catalog, id) = catalog_with(1.0);
        let mut line = LineRequest::new(id, 1);
        line.submitted.insert("price".into(), serde_json::json!(500.0));
        let (items, _) = price_lines(&catalog, &Rates::fallback(), Currency::Usd, &[line]).unwrap();
        assert_eq!(items[0].price_in_currency, 1.0);
    }
}
