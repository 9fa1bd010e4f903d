//! Domain models for the storefront.
//!
//! These types are validated domain objects, separate from database row types,
//! and they serialize directly to the JSON wire shapes the API returns.

pub mod outfit;
pub mod product;

pub use outfit::Outfit;
pub use product::{Product, Shop};
