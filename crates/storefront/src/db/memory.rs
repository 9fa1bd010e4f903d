//! In-process catalog with the same semantics as [`PgCatalog`](super::PgCatalog).
//!
//! Used by tests and local demos. The store can be flagged unavailable to
//! exercise the operational error path.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use aistylehub_core::{OutfitId, ProductId};

use super::catalog::{distinct_ids, join_ids};
use super::{Catalog, RepositoryError};
use crate::models::{Outfit, Product};

/// Catalog held entirely in memory.
pub struct InMemoryCatalog {
    products: Vec<Product>,
    outfits: RwLock<Vec<Outfit>>,
    next_outfit_id: AtomicI32,
    unavailable: AtomicBool,
}

impl InMemoryCatalog {
    /// Create a catalog from seeded products.
    ///
    /// Products are kept in listing order: newest first, ties broken by the
    /// higher id.
    #[must_use]
    pub fn new(mut products: Vec<Product>) -> Self {
        products.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_i32().cmp(&a.id.as_i32()))
        });

        Self {
            products,
            outfits: RwLock::new(Vec::new()),
            next_outfit_id: AtomicI32::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate the store going down (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every outfit created so far.
    pub async fn outfits(&self) -> Vec<Outfit> {
        self.outfits.read().await.clone()
    }

    /// Number of outfits created so far.
    pub async fn outfit_count(&self) -> usize {
        self.outfits.read().await.len()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory catalog marked unavailable".to_owned(),
            ));
        }
        Ok(())
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        Ok(self.products.clone())
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.check_available()?;
        Ok(self.product(id).cloned())
    }

    async fn create_outfit(
        &self,
        style: &str,
        image_url: Option<&str>,
        product_ids: &[ProductId],
    ) -> Result<Outfit, RepositoryError> {
        self.check_available()?;

        let ids = distinct_ids(product_ids);
        if ids.is_empty() {
            return Err(RepositoryError::Invalid(
                "an outfit needs at least one product".to_owned(),
            ));
        }

        let missing: Vec<ProductId> = ids
            .iter()
            .copied()
            .filter(|id| self.product(*id).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(RepositoryError::NotFound(format!(
                "products {}",
                join_ids(&missing)
            )));
        }

        let products = ids
            .iter()
            .filter_map(|id| self.product(*id).cloned())
            .collect();

        let outfit = Outfit {
            id: OutfitId::new(self.next_outfit_id.fetch_add(1, Ordering::SeqCst)),
            style: style.to_owned(),
            image_url: image_url.map(str::to_owned),
            products,
            created_at: Utc::now(),
        };

        self.outfits.write().await.push(outfit.clone());
        Ok(outfit)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }
}
