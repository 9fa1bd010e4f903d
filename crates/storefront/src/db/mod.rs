//! Database operations for the storefront `PostgreSQL` catalog.
//!
//! # Database: `stylehub`
//!
//! ## Tables (schema `catalog`)
//!
//! - `shop` - Retailers, seeded once
//! - `product` - Catalog products, seeded once, read-only at request time
//! - `outfit` - One row per successful recommend/try-on request
//! - `outfit_product` - Ordered product membership of each outfit
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p aistylehub-cli -- migrate
//! ```

pub mod catalog;
pub mod memory;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::{Catalog, PgCatalog};
pub use memory::InMemoryCatalog;

/// SQLSTATE codes raised while establishing a session rather than by a query.
const CONNECTION_SQLSTATES: &[&str] = &[
    "08000", // connection_exception
    "08001", // sqlclient_unable_to_establish_sqlconnection
    "08004", // sqlserver_rejected_establishment_of_sqlconnection
    "08006", // connection_failure
    "28000", // invalid_authorization_specification
    "28P01", // invalid_password
    "3D000", // invalid_catalog_name (database does not exist)
    "57P03", // cannot_connect_now
];

/// Errors that can occur during repository operations.
///
/// `Unavailable` and `NotFound` are kept apart from the generic variants so
/// callers can answer with an operational message or a 404 respectively.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Requested entity was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected before touching the store.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Returns true if the store itself could not be reached.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => Self::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err)
                if db_err
                    .code()
                    .is_some_and(|code| CONNECTION_SQLSTATES.iter().any(|c| *c == code)) =>
            {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::RowNotFound => Self::NotFound("row".to_owned()),
            _ => Self::Database(err),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// Connects eagerly; used by the CLI where a dead database should fail fast.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Create a `PostgreSQL` connection pool that connects on first use.
///
/// The server starts even while the database is down; requests then fail
/// with [`RepositoryError::Unavailable`] instead of the process exiting.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url.expose_secret())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(RepositoryError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(RepositoryError::from(sqlx::Error::PoolClosed).is_unavailable());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(RepositoryError::from(sqlx::Error::Io(io)).is_unavailable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::NotFound(_)
        ));
    }

    #[test]
    fn test_other_errors_are_generic() {
        let err = RepositoryError::from(sqlx::Error::Protocol("bad message".to_owned()));
        assert!(matches!(err, RepositoryError::Database(_)));
        assert!(!err.is_unavailable());
    }

    #[tokio::test]
    async fn test_lazy_pool_rejects_malformed_url() {
        let url = secrecy::SecretString::from("not a url");
        assert!(create_lazy_pool(&url).is_err());
    }
}
