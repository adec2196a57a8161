//! Persistence for the storefront's shared state.
//!
//! # Database: `SQLite`
//!
//! ## Tables
//!
//! - `kv_store` - JSON documents keyed by name (see [`keys`])
//! - `tower_sessions` - Per-visitor sessions (created by `SqliteStore`)
//!
//! Per-visitor containers (cart, wishlist, current user) live in the session.
//! Shared containers (orders, registered users) live in `kv_store`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod orders;
pub mod store;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;
use tower_sessions_sqlx_store::SqliteStore;

pub use orders::OrderRepository;
pub use store::{LocalStore, keys};
pub use users::UserRepository;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Value could not be encoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unique constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Create an `SQLite` connection pool, creating the database file if needed.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection fails.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a single-connection in-memory pool.
///
/// Every `SQLite` connection to `:memory:` is a separate database, so the pool
/// is pinned to one connection that is never recycled.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection fails.
pub async fn create_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Run storefront migrations and create the session table.
///
/// # Errors
///
/// Returns `RepositoryError` if either step fails.
pub async fn migrate(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    SqliteStore::new(pool.clone()).migrate().await?;
    Ok(())
}
