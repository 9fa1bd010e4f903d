//! Outfit assembly: cache lookup, catalog read, inference, persistence.
//!
//! Both flows share one shape: answer from the cache when possible, otherwise
//! compute, persist an [`Outfit`](crate::models::Outfit), fill the cache and
//! return. Failures never reach the cache. A failure after persistence simply
//! means the next identical request computes (and persists) again.
//!
//! Concurrent identical requests are not coalesced: both may miss the cache and
//! both create an outfit.

#[cfg(test)]
pub(crate) mod fakes;
pub mod image;
pub mod payload;
pub mod selection;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument};

use aistylehub_core::{ProductId, StylePrompt};

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::cache::{CacheKey, CacheValue, ResponseCache};
use crate::db::{Catalog, RepositoryError};
use crate::inference::{
    CatalogEntry, DEFAULT_MAX_ITEMS, InferenceError, OutfitRecommender, OverlayGenerator,
    OverlayRequest,
};

pub use image::{ImageError, ImageUpload, MAX_IMAGE_BYTES};
pub use payload::{Cached, ProductListing, RecommendationPayload, ShopLink, TryOnPayload};
pub use selection::{Selection, SelectionSource, select_products};

/// Errors from the outfit pipeline.
#[derive(Debug, Error)]
pub enum OutfitError {
    /// The uploaded image was rejected.
    #[error(transparent)]
    InvalidImage(#[from] ImageError),

    /// The requested product does not exist.
    #[error("Product not found")]
    ProductNotFound(ProductId),

    /// There is nothing to recommend from.
    #[error("Product catalog is empty")]
    EmptyCatalog,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Orchestrates the recommend and try-on flows.
pub struct OutfitService {
    catalog: Arc<dyn Catalog>,
    recommender: Arc<dyn OutfitRecommender>,
    generator: Arc<dyn OverlayGenerator>,
    artifacts: ArtifactStore,
    cache: ResponseCache,
    overlay: OverlayRequest,
}

impl OutfitService {
    /// Create a new outfit service.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        recommender: Arc<dyn OutfitRecommender>,
        generator: Arc<dyn OverlayGenerator>,
        artifacts: ArtifactStore,
        cache: ResponseCache,
    ) -> Self {
        Self {
            catalog,
            recommender,
            generator,
            artifacts,
            cache,
            overlay: OverlayRequest::default(),
        }
    }

    /// The catalog this service reads from.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// The response cache.
    #[must_use]
    pub const fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// List the catalog, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OutfitError::Repository` if the catalog cannot be read.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Cached<ProductListing>, OutfitError> {
        let key = CacheKey::Products;
        if let Some(CacheValue::Products(listing)) = self.cache.get(&key.to_string()).await {
            debug!("Product listing served from cache");
            return Ok(Cached::hit(listing));
        }

        let listing = ProductListing {
            products: self.catalog.list_products().await?,
        };

        self.cache
            .set(key.to_string(), CacheValue::Products(listing.clone()), key.ttl())
            .await;
        Ok(Cached::miss(listing))
    }

    /// Recommend and persist an outfit for `prompt`.
    ///
    /// # Errors
    ///
    /// - `EmptyCatalog` when there are no products
    /// - `Inference` when the stylist call fails (no fallback is attempted)
    /// - `Repository` when the catalog cannot be read or written
    #[instrument(skip(self, prompt), fields(style = %prompt))]
    pub async fn recommend(
        &self,
        prompt: &StylePrompt,
    ) -> Result<Cached<RecommendationPayload>, OutfitError> {
        let key = CacheKey::recommend(prompt);
        let cache_key = key.to_string();

        if let Some(CacheValue::Recommendation(payload)) = self.cache.get(&cache_key).await {
            debug!(key = %cache_key, "Recommendation served from cache");
            return Ok(Cached::hit(payload));
        }

        let products = self.catalog.list_products().await?;
        if products.is_empty() {
            return Err(OutfitError::EmptyCatalog);
        }

        let entries: Vec<CatalogEntry<'_>> = products.iter().map(CatalogEntry::from).collect();
        let recommended = self
            .recommender
            .recommend_product_ids(prompt.as_str(), &entries, DEFAULT_MAX_ITEMS)
            .await?;

        let selection = select_products(&products, &recommended, prompt);
        info!(
            source = %selection.source,
            selected = selection.ids.len(),
            padded = selection.padded,
            "Selected outfit products"
        );

        let outfit = self
            .catalog
            .create_outfit(prompt.as_str(), None, &selection.ids)
            .await?;
        info!(outfit_id = %outfit.id, "Persisted recommended outfit");

        let payload = RecommendationPayload::new(outfit.products);
        self.cache
            .set(
                cache_key,
                CacheValue::Recommendation(payload.clone()),
                key.ttl(),
            )
            .await;

        Ok(Cached::miss(payload))
    }

    /// Render, store and persist a virtual try-on of `product_id`.
    ///
    /// `user_image` is base64, optionally prefixed with a `data:` URI header.
    ///
    /// # Errors
    ///
    /// - `ProductNotFound` before the image is even looked at
    /// - `InvalidImage` for empty, undecodable or oversized images
    /// - `Inference` when image generation fails
    /// - `Artifact` when the image cannot be stored
    /// - `Repository` when the catalog cannot be read or written
    #[instrument(skip(self, user_image))]
    pub async fn try_on(
        &self,
        user_image: &str,
        product_id: ProductId,
    ) -> Result<Cached<TryOnPayload>, OutfitError> {
        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(OutfitError::ProductNotFound(product_id))?;

        let upload = ImageUpload::parse(user_image);
        let image = upload.decode()?;
        debug!(
            mime_type = upload.mime_type(),
            bytes = image.len(),
            "Decoded try-on upload"
        );

        let key = CacheKey::try_on(product_id, upload.base64());
        let cache_key = key.to_string();
        if let Some(CacheValue::TryOn(payload)) = self.cache.get(&cache_key).await {
            debug!("Try-on served from cache");
            return Ok(Cached::hit(*payload));
        }

        let generated = self.generator.generate_overlay(&image, &self.overlay).await?;
        let image_url = self
            .artifacts
            .save(&generated.bytes, &generated.mime_type)
            .await?;

        let style = format!("Virtual try-on for {}", product.name);
        let outfit = self
            .catalog
            .create_outfit(&style, Some(&image_url), &[product.id])
            .await?;
        info!(outfit_id = %outfit.id, image_url = %image_url, "Persisted try-on outfit");

        let payload = TryOnPayload {
            outfit,
            shop: product.shop,
        };
        self.cache
            .set(
                cache_key,
                CacheValue::TryOn(Box::new(payload.clone())),
                key.ttl(),
            )
            .await;

        Ok(Cached::miss(payload))
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    use aistylehub_core::ProductType;

    use super::fakes::{FakeGenerator, FakeRecommender};
    use super::*;
    use crate::db::InMemoryCatalog;
    use crate::models::Product;
    use crate::models::product::fixtures::product;

    struct Harness {
        service: OutfitService,
        catalog: Arc<InMemoryCatalog>,
        recommender: Arc<FakeRecommender>,
        generator: Arc<FakeGenerator>,
        uploads: tempfile::TempDir,
    }

    impl Harness {
        fn new(products: Vec<Product>, recommender: FakeRecommender, generator: FakeGenerator) -> Self {
            let catalog = Arc::new(InMemoryCatalog::new(products));
            let recommender = Arc::new(recommender);
            let generator = Arc::new(generator);
            let uploads = tempfile::tempdir().expect("tempdir");

            let service = OutfitService::new(
                catalog.clone(),
                recommender.clone(),
                generator.clone(),
                ArtifactStore::new(uploads.path(), "/uploads"),
                ResponseCache::new(),
            );

            Self {
                service,
                catalog,
                recommender,
                generator,
                uploads,
            }
        }

        fn uploaded_files(&self) -> usize {
            std::fs::read_dir(self.uploads.path())
                .map(Iterator::count)
                .unwrap_or(0)
        }
    }

    fn office_catalog() -> Vec<Product> {
        vec![
            product(1, ProductType::Top, &["office"]),
            product(2, ProductType::Bottom, &["office"]),
            product(3, ProductType::Footwear, &["street"]),
            product(4, ProductType::Accessory, &["office"]),
        ]
    }

    fn prompt(s: &str) -> StylePrompt {
        StylePrompt::parse(s).expect("valid prompt")
    }

    fn outfit_ids(payload: &RecommendationPayload) -> Vec<i32> {
        payload.outfit.iter().map(|p| p.id.as_i32()).collect()
    }

    fn photo(len: usize) -> String {
        STANDARD.encode(vec![0xAB_u8; len])
    }

    #[tokio::test]
    async fn test_recommend_keeps_stylist_order_then_serves_cache() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[2, 1, 4]),
            FakeGenerator::returning("image/png"),
        );

        let first = h.service.recommend(&prompt("minimalist office")).await.expect("recommend");
        assert!(!first.cached);
        assert_eq!(outfit_ids(&first.payload), vec![2, 1, 4]);
        assert_eq!(first.payload.shops.len(), 3);

        let second = h.service.recommend(&prompt("minimalist office")).await.expect("recommend");
        assert!(second.cached);
        assert_eq!(outfit_ids(&second.payload), vec![2, 1, 4]);

        assert_eq!(h.recommender.calls(), 1);
        assert_eq!(h.catalog.outfit_count().await, 1);
    }

    #[tokio::test]
    async fn test_recommend_cache_key_is_normalized() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[1, 2, 3]),
            FakeGenerator::returning("image/png"),
        );

        let first = h.service.recommend(&prompt("Elegant Office ")).await.expect("first");
        let second = h.service.recommend(&prompt("elegant office")).await.expect("second");

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(outfit_ids(&first.payload), outfit_ids(&second.payload));
        assert_eq!(h.recommender.calls(), 1);
    }

    #[tokio::test]
    async fn test_recommend_persists_original_style_text() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[1, 2, 4]),
            FakeGenerator::returning("image/png"),
        );

        h.service.recommend(&prompt("  Smart Casual ")).await.expect("recommend");

        let outfits = h.catalog.outfits().await;
        assert_eq!(outfits[0].style, "  Smart Casual ");
        assert_eq!(outfits[0].image_url, None);
        assert_eq!(h.recommender.last_style().as_deref(), Some("  Smart Casual "));
    }

    #[tokio::test]
    async fn test_recommend_falls_back_to_tagged_products() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[999]),
            FakeGenerator::returning("image/png"),
        );

        let result = h.service.recommend(&prompt("street wear")).await.expect("recommend");
        let ids = outfit_ids(&result.payload);

        assert!(ids.contains(&3));
        assert!((3..=5).contains(&ids.len()));
    }

    #[tokio::test]
    async fn test_recommend_empty_catalog_is_fatal() {
        let h = Harness::new(
            Vec::new(),
            FakeRecommender::returning(&[1]),
            FakeGenerator::returning("image/png"),
        );

        let err = h.service.recommend(&prompt("office")).await.unwrap_err();
        assert!(matches!(err, OutfitError::EmptyCatalog));
        assert_eq!(h.recommender.calls(), 0);
    }

    #[tokio::test]
    async fn test_recommend_stylist_failure_is_not_cached() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::failing("Failed to parse OpenAI JSON response"),
            FakeGenerator::returning("image/png"),
        );

        for _ in 0..2 {
            let err = h.service.recommend(&prompt("office")).await.unwrap_err();
            assert_eq!(err.to_string(), "Failed to parse OpenAI JSON response");
        }

        assert_eq!(h.recommender.calls(), 2);
        assert_eq!(h.catalog.outfit_count().await, 0);
        assert!(h.service.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_recommend_store_unavailable() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[1, 2, 3]),
            FakeGenerator::returning("image/png"),
        );
        h.catalog.set_unavailable(true);

        let err = h.service.recommend(&prompt("office")).await.unwrap_err();
        assert!(matches!(err, OutfitError::Repository(ref e) if e.is_unavailable()));
    }

    #[tokio::test]
    async fn test_list_products_is_cached() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[]),
            FakeGenerator::returning("image/png"),
        );

        let first = h.service.list_products().await.expect("list");
        assert!(!first.cached);
        assert_eq!(first.payload.products.len(), 4);

        // Served from cache even though the store went away
        h.catalog.set_unavailable(true);
        let second = h.service.list_products().await.expect("list");
        assert!(second.cached);
        assert_eq!(second.payload.products.len(), 4);
    }

    #[tokio::test]
    async fn test_try_on_generates_stores_and_caches() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[]),
            FakeGenerator::returning("image/jpeg"),
        );
        let image = format!("data:image/png;base64,{}", photo(256));

        let first = h.service.try_on(&image, ProductId::new(2)).await.expect("try-on");
        assert!(!first.cached);

        let outfit = &first.payload.outfit;
        assert_eq!(outfit.style, "Virtual try-on for Product 2");
        assert_eq!(outfit.products.len(), 1);
        assert_eq!(first.payload.shop.name, outfit.products[0].shop.name);

        let url = outfit.image_url.as_deref().expect("image url");
        let name = url.strip_prefix("/uploads/").expect("uploads prefix");
        assert!(name.ends_with(".jpg"));
        let stored = std::fs::read(h.uploads.path().join(name)).expect("stored file");
        assert!(stored.starts_with(b"overlay:"));

        let second = h.service.try_on(&image, ProductId::new(2)).await.expect("try-on");
        assert!(second.cached);
        assert_eq!(second.payload.outfit.id, outfit.id);
        assert_eq!(h.generator.calls(), 1);
        assert_eq!(h.uploaded_files(), 1);
    }

    #[tokio::test]
    async fn test_try_on_different_image_or_product_misses_cache() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[]),
            FakeGenerator::returning("image/png"),
        );
        let image = photo(300);
        let mut other = photo(300).into_bytes();
        other[0] = b'Q';
        let other = String::from_utf8(other).expect("ascii");

        h.service.try_on(&image, ProductId::new(1)).await.expect("a");
        let b = h.service.try_on(&other, ProductId::new(1)).await.expect("b");
        let c = h.service.try_on(&image, ProductId::new(3)).await.expect("c");

        assert!(!b.cached);
        assert!(!c.cached);
        assert_eq!(h.generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_try_on_oversized_image_is_rejected_before_generation() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[]),
            FakeGenerator::returning("image/png"),
        );
        let image = photo(6 * 1024 * 1024);

        let err = h.service.try_on(&image, ProductId::new(1)).await.unwrap_err();

        assert!(matches!(err, OutfitError::InvalidImage(ImageError::TooLarge { .. })));
        assert_eq!(err.to_string(), "Image exceeds the 5MB upload limit");
        assert_eq!(h.generator.calls(), 0);
        assert_eq!(h.uploaded_files(), 0);
        assert_eq!(h.catalog.outfit_count().await, 0);
    }

    #[tokio::test]
    async fn test_try_on_unknown_product_stops_early() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[]),
            FakeGenerator::returning("image/png"),
        );

        // Invalid image too: the product lookup must fail first
        let err = h.service.try_on("", ProductId::new(9999)).await.unwrap_err();

        assert!(matches!(err, OutfitError::ProductNotFound(id) if id.as_i32() == 9999));
        assert_eq!(h.generator.calls(), 0);
        assert!(h.service.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_try_on_generator_failure_writes_nothing() {
        let h = Harness::new(
            office_catalog(),
            FakeRecommender::returning(&[]),
            FakeGenerator::failing(),
        );

        let err = h.service.try_on(&photo(200), ProductId::new(1)).await.unwrap_err();

        assert_eq!(err.to_string(), "Hugging Face returned error: Model is loading");
        assert_eq!(h.uploaded_files(), 0);
        assert_eq!(h.catalog.outfit_count().await, 0);
        assert!(h.service.cache().is_empty().await);
    }
}
