//! AIStyleHub storefront - fashion catalog, outfit recommendations and
//! virtual try-on.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` catalog (shops, products, persisted outfits)
//! - `OpenAI` chat completions for outfit recommendations
//! - Hugging Face image-to-image inference for virtual try-on
//! - In-process TTL cache in front of all three API routes
//!
//! Migrations and seeding are run separately through the `stylehub` CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use aistylehub_storefront::artifacts::ArtifactStore;
use aistylehub_storefront::cache::ResponseCache;
use aistylehub_storefront::config::{StorefrontConfig, UPLOADS_URL_PREFIX};
use aistylehub_storefront::db::{self, PgCatalog};
use aistylehub_storefront::inference::{HuggingFaceRenderer, OpenAiStylist};
use aistylehub_storefront::routes;
use aistylehub_storefront::services::outfits::OutfitService;
use aistylehub_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aistylehub_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Connections are opened on first use so the process starts (and reports
    // 503s) while the database is down.
    let pool = db::create_lazy_pool(&config.database_url).expect("Invalid database URL");
    let catalog = Arc::new(PgCatalog::new(pool));

    let stylist =
        OpenAiStylist::new(&config.inference).expect("Failed to build OpenAI client");
    let renderer =
        HuggingFaceRenderer::new(&config.inference).expect("Failed to build Hugging Face client");
    if config.inference.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, /recommend will fail");
    }
    if config.inference.hf_api_key.is_none() {
        tracing::warn!("HF_API_KEY not set, /try-on will fail");
    }

    let artifacts = ArtifactStore::new(config.uploads_dir.clone(), UPLOADS_URL_PREFIX);
    let outfits = OutfitService::new(
        catalog,
        Arc::new(stylist),
        Arc::new(renderer),
        artifacts,
        ResponseCache::new(),
    );

    let state = AppState::new(config.clone(), outfits);

    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
