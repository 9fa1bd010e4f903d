//! Seed the catalog with shops and products from a YAML file.
//!
//! The file lists shops, one image base URL per product type, and product
//! templates. Every template expands into one product per colour variation;
//! see `crates/cli/data/catalog.yaml` for the layout.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use aistylehub_core::ProductType;
use aistylehub_storefront::db;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use super::{CommandError, database_url};

/// Price step between variations when a template does not set one.
const DEFAULT_PRICE_INCREMENT: Decimal = Decimal::TWO;

/// Errors from loading or applying a seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Top-level layout of a seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub shops: Vec<ShopSeed>,
    pub image_base: HashMap<ProductType, String>,
    pub products: Vec<ProductTemplate>,
}

#[derive(Debug, Deserialize)]
pub struct ShopSeed {
    pub name: String,
    pub url: String,
}

/// A product line sold in several colours.
#[derive(Debug, Deserialize)]
pub struct ProductTemplate {
    pub base_name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub base_price: Decimal,
    #[serde(default)]
    pub price_increment: Option<Decimal>,
    #[serde(default)]
    pub style_tags: Vec<String>,
    pub shop: String,
    pub variations: Vec<String>,
}

/// One product row ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSeed {
    pub name: String,
    pub product_type: ProductType,
    pub price: Decimal,
    pub image_url: String,
    pub style_tags: Vec<String>,
    pub shop: String,
}

impl CatalogFile {
    /// Problems that would make seeding fail half way.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut shop_names = HashSet::new();
        for shop in &self.shops {
            if !shop_names.insert(shop.name.as_str()) {
                errors.push(format!("duplicate shop: {}", shop.name));
            }
        }

        for template in &self.products {
            let label = &template.base_name;
            if !shop_names.contains(template.shop.as_str()) {
                errors.push(format!("{label}: unknown shop {}", template.shop));
            }
            if !self.image_base.contains_key(&template.product_type) {
                errors.push(format!(
                    "{label}: no image_base for type {}",
                    template.product_type
                ));
            }
            if template.variations.is_empty() {
                errors.push(format!("{label}: no variations"));
            }
            if template.base_price.is_sign_negative() {
                errors.push(format!("{label}: negative base_price"));
            }
        }

        errors
    }

    /// Expand templates into products, numbering images from 1 in file order.
    #[must_use]
    pub fn expand(&self) -> Vec<ProductSeed> {
        let mut counter = 0_u32;
        let mut products = Vec::new();

        for template in &self.products {
            let increment = template
                .price_increment
                .unwrap_or(DEFAULT_PRICE_INCREMENT);
            let image_base = self
                .image_base
                .get(&template.product_type)
                .map_or("", String::as_str);

            for (index, variant) in (0_u32..).zip(&template.variations) {
                counter += 1;
                let price = (template.base_price + increment * Decimal::from(index)).round_dp(2);

                products.push(ProductSeed {
                    name: format!("{variant} {}", template.base_name).trim().to_owned(),
                    product_type: template.product_type,
                    price,
                    image_url: format!("{image_base}&sig={counter}"),
                    style_tags: template.style_tags.clone(),
                    shop: template.shop.clone(),
                });
            }
        }

        products
    }
}

/// Load a catalog file and write it to the database.
///
/// The file is parsed and validated before any connection is made. All
/// writes happen in one transaction.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or if a database
/// operation fails.
pub async fn run(path: &Path, reset: bool) -> Result<(), SeedError> {
    info!(path = %path.display(), "Loading catalog file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = catalog.validate();
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let products = catalog.expand();
    info!(
        shops = catalog.shops.len(),
        products = products.len(),
        "Parsed catalog"
    );

    let pool = db::create_pool(&database_url()?).await?;
    let mut tx = pool.begin().await?;

    if reset {
        info!("Removing existing outfits, products and shops");
        sqlx::query("DELETE FROM catalog.outfit").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM catalog.product").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM catalog.shop").execute(&mut *tx).await?;
    }

    let mut shop_ids: HashMap<&str, i32> = HashMap::new();
    for shop in &catalog.shops {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO catalog.shop (name, url)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET url = EXCLUDED.url
            RETURNING id
            ",
        )
        .bind(&shop.name)
        .bind(&shop.url)
        .fetch_one(&mut *tx)
        .await?;
        shop_ids.insert(shop.name.as_str(), id);
    }

    for product in &products {
        let Some(shop_id) = shop_ids.get(product.shop.as_str()) else {
            continue;
        };
        sqlx::query(
            r"
            INSERT INTO catalog.product (name, product_type, price, image_url, style_tags, shop_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(&product.name)
        .bind(product.product_type)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(&product.style_tags)
        .bind(shop_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        "Seeded {} shops and {} products.",
        shop_ids.len(),
        products.len()
    );
    Ok(())
}
