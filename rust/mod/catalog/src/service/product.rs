use tracing::info;

use storefront_core::{ServiceError, new_id, now_rfc3339};
use storefront_sql::Value;

use super::{CatalogService, required, storage};
use crate::model::{GameVersion, NewProduct, Product, ProductFilter};
use crate::slug::{encode_product_name, slug_key};

const TABLE: &str = "products";

impl CatalogService {
    /// Products matching every set field of `filter`. `search` is a
    /// case-insensitive substring match on the name.
    pub fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, ServiceError> {
        let filter = filter.normalized();
        let mut clauses = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        let exact = [
            ("game_version", filter.game_version),
            ("league", filter.league),
            ("difficulty", filter.difficulty),
            ("category", filter.category),
        ];
        for (col, val) in exact {
            if let Some(v) = val {
                params.push(v.into());
                clauses.push(format!("{} = ?{}", col, params.len()));
            }
        }
        if let Some(search) = filter.search {
            params.push(format!("%{}%", escape_like(&search)).into());
            clauses.push(format!("name LIKE ?{} ESCAPE '\\'", params.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT data FROM {}{} ORDER BY name ASC", TABLE, where_sql);
        self.query_records(&sql, &params)
    }

    /// Products for one game version / league / difficulty.
    pub fn products_for(
        &self,
        game_version: GameVersion,
        league: &str,
        difficulty: &str,
    ) -> Result<Vec<Product>, ServiceError> {
        self.list_products(ProductFilter {
            game_version: Some(game_version.as_str().to_string()),
            league: Some(league.to_string()),
            difficulty: Some(difficulty.to_string()),
            ..Default::default()
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Product, ServiceError> {
        self.get_record(TABLE, id)
    }

    /// Look up a product by its encoded name, optionally narrowed by league
    /// and difficulty (`any` is ignored).
    pub fn get_product_by_slug(
        &self,
        slug: &str,
        league: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Product, ServiceError> {
        let key = slug_key(slug);
        let candidates = self.list_products(ProductFilter {
            league: league.map(str::to_string),
            difficulty: difficulty.map(str::to_string),
            ..Default::default()
        })?;
        candidates
            .into_iter()
            .find(|p| slug_key(&p.name) == key)
            .ok_or_else(|| ServiceError::NotFound(format!("product '{}' not found", slug)))
    }

    /// Distinct category names, sorted.
    pub fn categories(&self) -> Result<Vec<String>, ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT DISTINCT category FROM products ORDER BY category ASC",
                &[],
            )
            .map_err(storage)?;
        Ok(rows
            .iter()
            .filter_map(|r| r.get_str("category").map(str::to_string))
            .collect())
    }

    pub fn create_product(&self, input: NewProduct) -> Result<Product, ServiceError> {
        required("name", &input.name)?;
        required("category", &input.category)?;
        required("imgUrl", &input.img_url)?;
        required("league", &input.league)?;
        required("difficulty", &input.difficulty)?;
        if !input.price.is_finite() || input.price < 0.0 {
            return Err(ServiceError::Validation("price must be >= 0".into()));
        }
        let game_version = GameVersion::from_str(&input.game_version).ok_or_else(|| {
            ServiceError::Validation(format!("invalid gameVersion '{}'", input.game_version))
        })?;
        let slug = match input.slug {
            Some(s) if !s.trim().is_empty() => s,
            _ => encode_product_name(&input.name),
        };

        let now = now_rfc3339();
        let product = Product {
            id: new_id(),
            name: input.name,
            category: input.category,
            description: input.description,
            slug,
            alt: input.alt,
            price: input.price,
            img_url: input.img_url,
            game_version,
            league: input.league,
            difficulty: input.difficulty,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        self.insert_record(TABLE, &product.id, &product, &indexes(&product))?;
        info!(id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    pub fn update_price(&self, id: &str, price: f64) -> Result<Product, ServiceError> {
        if !price.is_finite() || price < 0.0 {
            return Err(ServiceError::Validation("price must be >= 0".into()));
        }
        let mut product = self.get_product(id)?;
        product.price = price;
        product.updated_at = Some(now_rfc3339());
        self.update_record(TABLE, id, &product, &indexes(&product))?;
        info!(id, price, "product price updated");
        Ok(product)
    }

    pub fn delete_product(&self, id: &str) -> Result<(), ServiceError> {
        self.delete_record(TABLE, id)?;
        info!(id, "product deleted");
        Ok(())
    }
}

fn indexes(p: &Product) -> Vec<(&'static str, Value)> {
    vec![
        ("name", p.name.as_str().into()),
        ("category", p.category.as_str().into()),
        ("game_version", p.game_version.as_str().into()),
        ("league", p.league.as_str().into()),
        ("difficulty", p.difficulty.as_str().into()),
        ("create_at", Value::opt_text(p.created_at.as_deref())),
    ]
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
