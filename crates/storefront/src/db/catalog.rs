//! Catalog repository: product reads and outfit creation.
//!
//! Queries are checked at runtime (`sqlx::query_as`) so the crate builds
//! without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use aistylehub_core::{OutfitId, Price, ProductId, ProductType, ShopId};

use super::RepositoryError;
use crate::models::{Outfit, Product, Shop};

/// Read access to the product catalog plus outfit persistence.
///
/// Implementations must keep the three failure kinds apart:
/// [`RepositoryError::Unavailable`], [`RepositoryError::NotFound`] and the
/// generic variants.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// List every product with its shop, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Look up a single product by ID.
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Atomically create an outfit linking `product_ids` in the given order.
    ///
    /// Duplicate ids are collapsed to their first occurrence. If any id does
    /// not exist, nothing is written and `NotFound` is returned.
    async fn create_outfit(
        &self,
        style: &str,
        image_url: Option<&str>,
        product_ids: &[ProductId],
    ) -> Result<Outfit, RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Collapse duplicate ids, keeping first occurrences in order.
pub(crate) fn distinct_ids(ids: &[ProductId]) -> Vec<ProductId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Format ids for error messages, e.g. `"4, 9"`.
pub(crate) fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// PostgreSQL implementation
// =============================================================================

const PRODUCT_COLUMNS: &str = r"
    p.id, p.name, p.product_type, p.price, p.image_url, p.style_tags, p.created_at,
    s.id AS shop_id, s.name AS shop_name, s.url AS shop_url
";

/// Flat row returned by product queries.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    product_type: ProductType,
    price: Decimal,
    image_url: String,
    style_tags: Vec<String>,
    created_at: DateTime<Utc>,
    shop_id: ShopId,
    shop_name: String,
    shop_url: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            product_type: row.product_type,
            price,
            image_url: row.image_url,
            style_tags: row.style_tags,
            shop: Shop {
                id: row.shop_id,
                name: row.shop_name,
                url: row.shop_url,
            },
            created_at: row.created_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Catalog backed by the `catalog` schema in `PostgreSQL`.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM catalog.product p
             JOIN catalog.shop s ON s.id = p.shop_id
             ORDER BY p.created_at DESC, p.id DESC"
        );

        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded catalog");
        into_products(rows)
    }

    #[instrument(skip(self))]
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM catalog.product p
             JOIN catalog.shop s ON s.id = p.shop_id
             WHERE p.id = $1"
        );

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    #[instrument(skip(self, image_url), fields(products = product_ids.len()))]
    async fn create_outfit(
        &self,
        style: &str,
        image_url: Option<&str>,
        product_ids: &[ProductId],
    ) -> Result<Outfit, RepositoryError> {
        let ids = distinct_ids(product_ids);
        if ids.is_empty() {
            return Err(RepositoryError::Invalid(
                "an outfit needs at least one product".to_owned(),
            ));
        }
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let mut tx = self.pool.begin().await?;

        // Lock the referenced products so they cannot disappear before commit
        let existing: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM catalog.product WHERE id = ANY($1) FOR SHARE",
        )
        .bind(&raw_ids)
        .fetch_all(&mut *tx)
        .await?;

        let missing: Vec<ProductId> = ids
            .iter()
            .copied()
            .filter(|id| !existing.contains(&id.as_i32()))
            .collect();
        if !missing.is_empty() {
            // Dropping the transaction rolls it back
            return Err(RepositoryError::NotFound(format!(
                "products {}",
                join_ids(&missing)
            )));
        }

        let (outfit_id, created_at): (OutfitId, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO catalog.outfit (style, image_url)
             VALUES ($1, $2)
             RETURNING id, created_at",
        )
        .bind(style)
        .bind(image_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO catalog.outfit_product (outfit_id, product_id, position)
             SELECT $1, t.product_id, (t.ord - 1)::int4
             FROM UNNEST($2::int4[]) WITH ORDINALITY AS t(product_id, ord)",
        )
        .bind(outfit_id)
        .bind(&raw_ids)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM catalog.outfit_product op
             JOIN catalog.product p ON p.id = op.product_id
             JOIN catalog.shop s ON s.id = p.shop_id
             WHERE op.outfit_id = $1
             ORDER BY op.position"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(outfit_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(outfit_id = %outfit_id, "Created outfit");

        Ok(Outfit {
            id: outfit_id,
            style: style.to_owned(),
            image_url: image_url.map(str::to_owned),
            products: into_products(rows)?,
            created_at,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
