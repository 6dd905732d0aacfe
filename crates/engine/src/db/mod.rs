//! Storage adapters for the fulfillment engine.
//!
//! ## Tables
//!
//! - `product`, `customer`, `address`, `state`, `location` - live catalog
//!   (read-only from the engine's perspective)
//! - `location_stock` - per-(location, product) quantities
//! - `product_snapshot`, `address_snapshot`, `customer_snapshot` - immutable
//!   order-time copies
//! - `orders`, `order_line` - orders and their (tombstonable) lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/engine/migrations/` and run via:
//! ```bash
//! cargo run -p packhouse-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate snapshot).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
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
