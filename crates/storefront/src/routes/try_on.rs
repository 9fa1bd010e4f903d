//! Virtual try-on handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use aistylehub_core::ProductId;

use crate::error::{AppError, FieldErrors, Result, add_breadcrumb};
use crate::services::outfits::{Cached, TryOnPayload};
use crate::state::AppState;

/// Largest accepted request body. Big enough that an oversized image reaches
/// validation and gets a proper 400.
pub const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Shortest plausible base64 image payload.
const MIN_IMAGE_CHARS: usize = 100;

/// Request body for `POST /try-on`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnRequest {
    #[serde(default)]
    pub user_image: Option<String>,
    #[serde(default)]
    pub product_id: Option<ProductIdInput>,
}

/// `productId` as sent by clients: a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductIdInput {
    Number(serde_json::Number),
    Text(String),
}

impl ProductIdInput {
    /// Coerce to a positive product id.
    fn to_product_id(&self) -> Option<ProductId> {
        let raw = match self {
            Self::Number(n) => n.as_i64().or_else(|| integral(n.as_f64()?))?,
            Self::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| integral(s.parse::<f64>().ok()?))?
            }
        };

        i32::try_from(raw)
            .ok()
            .filter(|id| *id > 0)
            .map(ProductId::new)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15).then_some(value as i64)
}

impl TryOnRequest {
    /// Validate into the image payload and product id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` listing every invalid field.
    pub fn validate(self) -> Result<(String, ProductId)> {
        let mut errors = FieldErrors::new();

        let image = match self.user_image {
            None => {
                errors.insert("userImage", vec!["userImage is required".to_owned()]);
                None
            }
            Some(image) if image.chars().count() < MIN_IMAGE_CHARS => {
                errors.insert(
                    "userImage",
                    vec!["userImage must be a base64 string".to_owned()],
                );
                None
            }
            Some(image) => Some(image),
        };

        let product_id = match self.product_id.as_ref().map(ProductIdInput::to_product_id) {
            Some(Some(id)) => Some(id),
            None => {
                errors.insert("productId", vec!["productId is required".to_owned()]);
                None
            }
            Some(None) => {
                errors.insert(
                    "productId",
                    vec!["productId must be a positive integer".to_owned()],
                );
                None
            }
        };

        match (image, product_id) {
            (Some(image), Some(product_id)) => Ok((image, product_id)),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// `POST /try-on` - render a product onto the user's photo.
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<TryOnRequest>, JsonRejection>,
) -> Result<Json<Cached<TryOnPayload>>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (image, product_id) = request.validate()?;

    let id = product_id.to_string();
    add_breadcrumb(
        "try_on",
        "Virtual try-on requested",
        Some(&[("product_id", id.as_str())]),
    );

    let payload = state.outfits().try_on(&image, product_id).await?;
    Ok(Json(payload))
}
