//! Response payloads produced by the outfit pipeline.
//!
//! These are what gets cached; the `cached` flag is added on the way out by
//! [`Cached`].

use serde::Serialize;

use crate::models::{Outfit, Product, Shop};

/// A payload annotated with whether it was served from the cache.
#[derive(Debug, Clone, Serialize)]
pub struct Cached<T> {
    #[serde(flatten)]
    pub payload: T,
    pub cached: bool,
}

impl<T> Cached<T> {
    pub const fn hit(payload: T) -> Self {
        Self {
            payload,
            cached: true,
        }
    }

    pub const fn miss(payload: T) -> Self {
        Self {
            payload,
            cached: false,
        }
    }
}

/// `GET /products`
#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub products: Vec<Product>,
}

/// Where to buy one product of a recommended outfit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopLink {
    pub name: String,
    pub url: String,
    pub product_name: String,
}

/// `POST /recommend`
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationPayload {
    pub outfit: Vec<Product>,
    pub shops: Vec<ShopLink>,
}

impl RecommendationPayload {
    /// Build the payload from an outfit's products, one shop link per product.
    #[must_use]
    pub fn new(outfit: Vec<Product>) -> Self {
        let shops = outfit
            .iter()
            .map(|product| ShopLink {
                name: product.shop.name.clone(),
                url: product.shop.url.clone(),
                product_name: product.name.clone(),
            })
            .collect();

        Self { outfit, shops }
    }
}

/// `POST /try-on`
#[derive(Debug, Clone, Serialize)]
pub struct TryOnPayload {
    pub outfit: Outfit,
    pub shop: Shop,
}
