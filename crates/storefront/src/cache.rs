//! Process-wide response cache with per-entry time-to-live.
//!
//! Backed by `moka`. Every `set` carries its own TTL and replaces both the
//! value and the expiry window of an existing entry. Expired entries are never
//! returned and are dropped lazily by moka's housekeeping; there is no size
//! bound. Nothing survives a restart: this is an optimization, never a system
//! of record.

use std::fmt;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use sha2::{Digest, Sha256};

use aistylehub_core::{ProductId, StylePrompt};

use crate::services::outfits::{ProductListing, RecommendationPayload, TryOnPayload};

/// TTL for the full product listing.
pub const PRODUCTS_TTL: Duration = Duration::from_secs(10 * 60);
/// TTL for recommendation payloads.
pub const RECOMMEND_TTL: Duration = Duration::from_secs(5 * 60);
/// TTL for try-on payloads.
pub const TRY_ON_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expiry policy reading the TTL stored alongside each value.
struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Key/value store with per-entry expiry.
///
/// Cheap to clone; clones share the same entries. Concurrent writers to the
/// same key race with last-write-wins.
#[derive(Clone)]
pub struct TtlCache<V: Clone + Send + Sync + 'static> {
    inner: Cache<String, Entry<V>>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().expire_after(PerEntryTtl).build(),
        }
    }

    /// Return the value for `key` unless it is absent or expired.
    ///
    /// A read that finds the entry expired also removes it.
    pub async fn get(&self, key: &str) -> Option<V> {
        match self.inner.get(key).await {
            Some(entry) => Some(entry.value),
            None => {
                // moka hides expired entries but only evicts them on housekeeping
                self.inner.invalidate(key).await;
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any existing entry.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.inner.insert(key.into(), Entry { value, ttl }).await;
    }

    /// Remove the entry for `key`, if any.
    pub async fn delete(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Number of live entries after pending evictions are applied.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    /// Returns true if no live entries remain.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Payloads stored in the response cache.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(ProductListing),
    Recommendation(RecommendationPayload),
    TryOn(Box<TryOnPayload>),
}

/// The shared response cache.
pub type ResponseCache = TtlCache<CacheValue>;

/// Cache keys for the storefront's cached responses.
///
/// The rendered key determines the request parameters that produced the
/// payload: identical requests collide, different requests do not.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// The full product listing.
    Products,
    /// A recommendation for a normalized style prompt.
    Recommend { normalized_style: String },
    /// A try-on for a product and an uploaded image.
    TryOn {
        product_id: ProductId,
        image_digest: String,
    },
}

impl CacheKey {
    /// Key for a recommendation request.
    #[must_use]
    pub fn recommend(prompt: &StylePrompt) -> Self {
        Self::Recommend {
            normalized_style: prompt.normalized().to_owned(),
        }
    }

    /// Key for a try-on request: product id plus the SHA-256 of the base64 payload.
    #[must_use]
    pub fn try_on(product_id: ProductId, base64_payload: &str) -> Self {
        Self::TryOn {
            product_id,
            image_digest: hex::encode(Sha256::digest(base64_payload.as_bytes())),
        }
    }

    /// How long a payload stored under this key stays fresh.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        match self {
            Self::Products => PRODUCTS_TTL,
            Self::Recommend { .. } => RECOMMEND_TTL,
            Self::TryOn { .. } => TRY_ON_TTL,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Products => f.write_str("products:all"),
            Self::Recommend { normalized_style } => write!(f, "recommend:{normalized_style}"),
            Self::TryOn {
                product_id,
                image_digest,
            } => write!(f, "tryon:{product_id}:{image_digest}"),
        }
    }
}
