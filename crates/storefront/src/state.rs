//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Catalog;
use crate::services::outfits::OutfitService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration and the outfit pipeline.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    outfits: OutfitService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, outfits: OutfitService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, outfits }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the outfit pipeline.
    #[must_use]
    pub fn outfits(&self) -> &OutfitService {
        &self.inner.outfits
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.outfits.catalog()
    }
}
