//! CLI subcommand implementations.

pub mod migrate;
pub mod orders;
pub mod users;

use secrecy::SecretString;
use sqlx::SqlitePool;
use thiserror::Error;

use bazaar_storefront::db::{self, RepositoryError};

/// Default database URL, matching the storefront's default.
const DEFAULT_DATABASE_URL: &str = "sqlite://bazaar.db?mode=rwc";

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage or migration error.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Invalid order status.
    #[error("{0}. Valid statuses: pending, confirmed, shipped, delivered")]
    InvalidStatus(String),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`.
async fn connect() -> Result<SqlitePool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL").unwrap_or_else(|_| {
        tracing::warn!("STOREFRONT_DATABASE_URL not set, using {DEFAULT_DATABASE_URL}");
        DEFAULT_DATABASE_URL.to_owned()
    });

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
