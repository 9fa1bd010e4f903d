//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the JSON error body is written:
//!
//! ```json
//! { "error": "Database unavailable", "hint": "Ensure the database ..." }
//! { "error": "Invalid request", "details": { "style": ["..."] } }
//! ```

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::db::RepositoryError;
use crate::inference::InferenceError;
use crate::services::outfits::OutfitError;

const DATABASE_HINT: &str = "Ensure the database is properly configured and running.";

/// Validation messages keyed by request field.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// One or more request fields failed validation.
    #[error("Invalid request")]
    Validation(FieldErrors),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// The catalog store could not be reached.
    #[error("Database unavailable")]
    Unavailable(#[source] RepositoryError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// An inference provider failed or is not configured.
    #[error("{0}")]
    Upstream(#[from] InferenceError),

    /// A generated image could not be stored.
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Unavailable(_) => Self::Unavailable(err),
            RepositoryError::NotFound(what) => Self::NotFound(format!("Not found: {what}")),
            other => Self::Database(other),
        }
    }
}

impl From<OutfitError> for AppError {
    fn from(err: OutfitError) -> Self {
        match err {
            OutfitError::InvalidImage(e) => Self::BadRequest(e.to_string()),
            OutfitError::ProductNotFound(_) => Self::NotFound(err.to_string()),
            OutfitError::EmptyCatalog => Self::Internal(err.to_string()),
            OutfitError::Repository(e) => e.into(),
            OutfitError::Inference(e) => Self::Upstream(e),
            OutfitError::Artifact(e) => Self::Artifact(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

impl AppError {
    /// Build a validation error for a single field.
    #[must_use]
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(BTreeMap::from([(field, vec![message.into()])]))
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Upstream(_) | Self::Artifact(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                source = ?std::error::Error::source(&self).map(ToString::to_string),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose database or filesystem details to clients
        let message = match &self {
            Self::Database(_) => "Internal server error".to_string(),
            Self::Artifact(_) => "Failed to store generated image".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            error: &message,
            hint: matches!(self, Self::Unavailable(_)).then_some(DATABASE_HINT),
            details: match &self {
                Self::Validation(fields) => Some(fields),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for a request stage.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("try_on", "Generating overlay", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
