//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /products       - Full catalog, newest first
//! POST /recommend      - Outfit recommendation for a style prompt
//! POST /try-on         - Virtual try-on image for a product
//! GET  /uploads/*      - Generated try-on images
//! GET  /health         - Liveness
//! GET  /health/ready   - Readiness (catalog ping)
//! ```

pub mod health;
pub mod products;
pub mod recommend;
pub mod try_on;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::UPLOADS_URL_PREFIX;
use crate::middleware::{make_request_span, request_id_middleware};
use crate::state::AppState;

/// 405 response naming the one supported method.
fn method_not_allowed(allow: &'static str) -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    response
}

/// API and health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(products::index).fallback(|| async { method_not_allowed("GET") }),
        )
        .route(
            "/recommend",
            post(recommend::create).fallback(|| async { method_not_allowed("POST") }),
        )
        .route(
            "/try-on",
            post(try_on::create)
                .fallback(|| async { method_not_allowed("POST") })
                .layer(DefaultBodyLimit::max(try_on::BODY_LIMIT)),
        )
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// The complete application router, minus the Sentry layers added in `main`.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config().uploads_dir);

    Router::new()
        .merge(routes())
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
}
