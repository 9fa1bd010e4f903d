//! Outbound inference calls.
//!
//! Two independent capabilities sit behind traits so the outfit pipeline can be
//! driven by fakes in tests:
//!
//! - [`OutfitRecommender`] picks catalog product ids for a style prompt
//!   ([`OpenAiStylist`], chat completions in JSON mode).
//! - [`OverlayGenerator`] renders a try-on overlay from a source photo
//!   ([`HuggingFaceRenderer`], image-to-image).
//!
//! Neither client retries. Credentials are checked when a call is made, so the
//! service starts without them and only the affected request fails.

pub mod huggingface;
pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use aistylehub_core::{Price, ProductId, ProductType};

pub use huggingface::{GeneratedImage, HuggingFaceRenderer, OverlayRequest};
pub use openai::OpenAiStylist;

/// Default upper bound on recommended items.
pub const DEFAULT_MAX_ITEMS: usize = 5;

/// Errors returned by inference providers.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Required credential is not configured.
    #[error("Missing {0} environment variable")]
    MissingCredential(&'static str),

    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("{provider} request failed: {status} {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Provider reported an error inside an otherwise successful response.
    #[error("{provider} returned error: {message}")]
    Service {
        provider: &'static str,
        message: String,
    },

    /// Request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// Response could not be interpreted.
    #[error("{0}")]
    InvalidResponse(String),

    /// JSON payload where an image was expected, without an error field.
    #[error("Unexpected Hugging Face response payload")]
    UnexpectedPayload,
}

impl InferenceError {
    /// Returns true for configuration problems rather than runtime failures.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential(_))
    }
}

/// Minimal catalog projection sent to the stylist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry<'a> {
    pub id: ProductId,
    pub name: &'a str,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub price: Price,
    pub style_tags: &'a [String],
    pub shop: &'a str,
}

impl<'a> From<&'a crate::models::Product> for CatalogEntry<'a> {
    fn from(product: &'a crate::models::Product) -> Self {
        Self {
            id: product.id,
            name: &product.name,
            product_type: product.product_type,
            price: product.price,
            style_tags: &product.style_tags,
            shop: &product.shop.name,
        }
    }
}

/// Chooses catalog products for a style prompt.
#[async_trait]
pub trait OutfitRecommender: Send + Sync {
    /// Return up to `max_items` distinct product ids, in dress order.
    ///
    /// Ids are not checked against the catalog here; callers filter them.
    async fn recommend_product_ids(
        &self,
        style: &str,
        catalog: &[CatalogEntry<'_>],
        max_items: usize,
    ) -> Result<Vec<ProductId>, InferenceError>;
}

/// Renders a try-on overlay image.
#[async_trait]
pub trait OverlayGenerator: Send + Sync {
    /// Generate an image from the decoded source photo.
    async fn generate_overlay(
        &self,
        image: &[u8],
        request: &OverlayRequest,
    ) -> Result<GeneratedImage, InferenceError>;
}
