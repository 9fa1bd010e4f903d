//! AIStyleHub storefront library.
//!
//! Catalog listing, AI outfit recommendations and virtual try-on behind a
//! small JSON API. The binary in `main.rs` wires these pieces to Postgres and
//! the inference providers.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod inference;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
