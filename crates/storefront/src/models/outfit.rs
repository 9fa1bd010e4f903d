//! Persisted outfit groupings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aistylehub_core::OutfitId;

use super::Product;

/// A grouping of catalog products produced by one recommend or try-on request.
///
/// Created exactly once and never mutated afterwards. `products` keeps the
/// order the products were selected in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    /// Unique outfit ID.
    pub id: OutfitId,
    /// The style prompt, or a synthetic label for try-ons.
    pub style: String,
    /// Generated try-on image, if any.
    pub image_url: Option<String>,
    /// Products in selection order.
    pub products: Vec<Product>,
    /// When the outfit was created.
    pub created_at: DateTime<Utc>,
}
