//! AIStyleHub Core - Shared domain types.
//!
//! This crate provides the types shared by the AIStyleHub components:
//! - `storefront` - JSON API serving the catalog, outfit recommendations and try-ons
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe ids, garment types, prices and style prompts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
