//! Product catalog route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::services::outfits::{Cached, ProductListing};
use crate::state::AppState;

/// `GET /products` - the whole catalog, newest first.
pub async fn index(State(state): State<AppState>) -> Result<Json<Cached<ProductListing>>> {
    let listing = state.outfits().list_products().await?;
    Ok(Json(listing))
}
