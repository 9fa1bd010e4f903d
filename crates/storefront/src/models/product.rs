//! Catalog product and shop types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aistylehub_core::{Price, ProductId, ProductType, ShopId, StylePrompt};

/// A retailer that sells catalog products.
///
/// Seeded once and never changed at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shop {
    /// Database ID (not exposed on the wire).
    #[serde(skip)]
    pub id: ShopId,
    /// Display name, e.g. "Uniqlo".
    pub name: String,
    /// Storefront URL of the retailer.
    pub url: String,
}

/// A catalog product with its shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Garment type.
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// Price in the shop's currency.
    pub price: Price,
    /// Product image URL.
    pub image_url: String,
    /// Descriptive style labels such as "office" or "street".
    pub style_tags: Vec<String>,
    /// The shop selling this product.
    pub shop: Shop,
    /// When the product was added to the catalog.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Returns true if any of the product's style tags appears in `prompt`.
    #[must_use]
    pub fn matches_style(&self, prompt: &StylePrompt) -> bool {
        self.style_tags.iter().any(|tag| prompt.mentions(tag))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;

    /// Build a product owned by a shop derived from its id.
    pub(crate) fn product(id: i32, product_type: ProductType, tags: &[&str]) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            product_type,
            price: Price::new(Decimal::new(4990 + i64::from(id), 2)).expect("valid price"),
            image_url: format!("https://images.example.com/{id}.jpg"),
            style_tags: tags.iter().map(|t| (*t).to_string()).collect(),
            shop: Shop {
                id: ShopId::new(id % 3 + 1),
                name: format!("Shop {}", id % 3 + 1),
                url: format!("https://shop{}.example.com", id % 3 + 1),
            },
            created_at: Utc
                .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp")
                + chrono::Duration::minutes(i64::from(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::product;
    use super::*;

    fn prompt(s: &str) -> StylePrompt {
        StylePrompt::parse(s).expect("valid prompt")
    }

    #[test]
    fn test_product_wire_shape() {
        let json = serde_json::to_value(product(1, ProductType::Top, &["office"]))
            .expect("serialize");

        assert_eq!(json["id"], 1);
        assert_eq!(json["type"], "top");
        assert_eq!(json["styleTags"][0], "office");
        assert_eq!(json["shop"]["name"], "Shop 2");
        assert!(json["shop"].get("id").is_none());
        assert!(json["imageUrl"].is_string());
        assert!(json["createdAt"].is_string());
        assert!(json["price"].is_number());
    }

    #[test]
    fn test_matches_style_is_case_insensitive() {
        let p = product(2, ProductType::Bottom, &["Office", "smart"]);
        assert!(p.matches_style(&prompt("Minimalist OFFICE")));
        assert!(!p.matches_style(&prompt("street wear")));
    }

    #[test]
    fn test_matches_style_ignores_blank_tags() {
        let p = product(3, ProductType::Footwear, &["  "]);
        assert!(!p.matches_style(&prompt("anything")));
    }
}
