//! JSON key-value store backed by the `kv_store` table.
//!
//! Reads fall back to the type's default when the key is missing or the stored
//! document no longer parses. Writes replace the whole document.
//!
//! Every write in this process goes through one lock, and [`LocalStore::update`]
//! reads and writes inside a single transaction, so concurrent requests never
//! overwrite each other's changes to a shared document.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteExecutor;
use tokio::sync::Mutex;

use super::RepositoryError;

/// Keys of the shared containers.
pub mod keys {
    /// All orders, as a JSON array.
    pub const ORDERS: &str = "orders";

    /// All registered users, as a JSON array.
    pub const REGISTERED_USERS: &str = "registered_users";
}

/// Shared JSON document store. Clones share the write lock.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read a document, or the default when missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load<T>(&self, key: &str) -> Result<T, RepositoryError>
    where
        T: DeserializeOwned + Default,
    {
        let raw = read_raw(&self.pool, key).await?;
        Ok(raw.map_or_else(T::default, |raw| decode_or_default(key, &raw)))
    }

    /// Replace a document. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if encoding or the query fails.
    pub async fn save<T>(&self, key: &str, value: &T) -> Result<(), RepositoryError>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        let _guard = self.write_lock.lock().await;
        write_raw(&self.pool, key, &raw).await?;

        tracing::debug!(key, "Stored document");
        Ok(())
    }

    /// Load a document, let `f` mutate it, and write it back atomically.
    ///
    /// Updates are serialized: no other write to the store can land between
    /// the read and the write. `f` may veto the write by returning an error,
    /// in which case the transaction is rolled back and nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a `RepositoryError` from the transaction.
    pub async fn update<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default + Sync,
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<RepositoryError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut value: T = read_raw(&mut *tx, key)
            .await
            .map_err(RepositoryError::from)?
            .map_or_else(T::default, |raw| decode_or_default(key, &raw));

        // Dropping `tx` on a veto rolls it back.
        let result = f(&mut value)?;

        let raw = serde_json::to_string(&value).map_err(RepositoryError::from)?;
        write_raw(&mut *tx, key, &raw)
            .await
            .map_err(RepositoryError::from)?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::debug!(key, "Updated document");
        Ok(result)
    }
}

async fn read_raw<'e>(
    executor: impl SqliteExecutor<'e>,
    key: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|(raw,)| raw))
}

async fn write_raw<'e>(
    executor: impl SqliteExecutor<'e>,
    key: &str,
    raw: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?1, ?2, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE
        SET value = excluded.value, updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(raw)
    .execute(executor)
    .await?;
    Ok(())
}

fn decode_or_default<T>(key: &str, raw: &str) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(key, error = %e, "Stored document is unreadable, using default");
        T::default()
    })
}
