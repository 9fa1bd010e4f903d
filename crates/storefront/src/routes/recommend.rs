//! Outfit recommendation handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;

use aistylehub_core::StylePrompt;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::services::outfits::{Cached, RecommendationPayload};
use crate::state::AppState;

/// Request body for `POST /recommend`.
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub style: Option<String>,
}

impl RecommendRequest {
    /// Validate into a style prompt.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` keyed on `style`.
    pub fn validate(self) -> Result<StylePrompt> {
        let style = self
            .style
            .ok_or_else(|| AppError::invalid_field("style", "style is required"))?;

        StylePrompt::parse(&style)
            .map_err(|_| AppError::invalid_field("style", "style description is required"))
    }
}

/// `POST /recommend` - pick, persist and return an outfit for a style prompt.
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<Cached<RecommendationPayload>>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let prompt = request.validate()?;

    add_breadcrumb(
        "recommend",
        "Outfit recommendation requested",
        Some(&[("style", prompt.normalized())]),
    );

    let payload = state.outfits().recommend(&prompt).await?;
    Ok(Json(payload))
}
