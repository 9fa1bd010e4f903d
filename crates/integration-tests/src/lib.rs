//! Integration tests for AIStyleHub.
//!
//! The tests in `tests/` talk to a running storefront over HTTP and are
//! `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Prepare the database
//! cargo run -p aistylehub-cli -- migrate
//! cargo run -p aistylehub-cli -- seed --reset
//!
//! # Start the storefront, then
//! cargo test -p aistylehub-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` overrides the default `http://localhost:3000`.

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}
