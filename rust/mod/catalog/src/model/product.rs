use serde::{Deserialize, Serialize};

use super::GameVersion;

/// A purchasable in-game item. Prices are in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub price: f64,
    pub img_url: String,
    pub game_version: GameVersion,
    pub league: String,
    pub difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    pub price: f64,
    pub img_url: String,
    pub game_version: String,
    pub league: String,
    pub difficulty: String,
}

/// Browse filter. Every field is optional; empty strings and `any` are
/// treated as unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default)]
    pub game_version: Option<String>,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ProductFilter {
    /// Drop blank and `any` values.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "any")
        }
        Self {
            game_version: clean(self.game_version),
            league: clean(self.league),
            difficulty: clean(self.difficulty),
            category: clean(self.category),
            search: clean(self.search),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_uses_camel_case_on_the_wire() {
        let p: Product = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "name": "Divine Orb",
            "category": "currency",
            "price": 0.5,
            "imgUrl": "https://cdn/divine.png",
            "gameVersion": "path-of-exile-1",
            "league": "Settlers",
            "difficulty": "softcore",
        }))
        .unwrap();
        assert_eq!(p.game_version, GameVersion::PathOfExile1);
        assert_eq!(p.description, "");

        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["imgUrl"], "https://cdn/divine.png");
        assert!(v.get("alt").is_none());
    }

    #[test]
    fn filter_drops_any_and_blank() {
        let f = ProductFilter {
            game_version: Some("path-of-exile-2".into()),
            league: Some("any".into()),
            difficulty: Some("  ".into()),
            category: None,
            search: Some(" orb ".into()),
        }
        .normalized();
        assert_eq!(f.game_version.as_deref(), Some("path-of-exile-2"));
        assert_eq!(f.league, None);
        assert_eq!(f.difficulty, None);
        assert_eq!(f.search.as_deref(), Some("orb"));
    }
}
