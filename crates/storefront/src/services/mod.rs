//! Business logic services for the storefront.
//!
//! - `outfits` - catalog listing, outfit recommendation and virtual try-on
//!   pipelines, with response caching

pub mod outfits;
