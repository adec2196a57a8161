//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::db::LocalStore;
use crate::services::{CatalogError, CatalogService, FormRelayClient, RelayError};
use crate::services::catalog::load_static_catalog;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("backend client error: {0}")]
    Backend(#[from] BackendError),
    #[error("relay client error: {0}")]
    Relay(#[from] RelayError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    store: LocalStore,
    catalog: CatalogService,
    relay: FormRelayClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Loads the static catalog and builds the backend and relay clients.
    /// The catalog change feed is not started; see [`AppState::start_change_feed`].
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the static catalog cannot be loaded or an HTTP
    /// client fails to build.
    pub fn new(config: StorefrontConfig, pool: SqlitePool) -> Result<Self, StateError> {
        let static_products = load_static_catalog(config.catalog_path.as_deref())?;
        let backend = config
            .backend
            .as_ref()
            .map(BackendClient::new)
            .transpose()?;
        let catalog = CatalogService::new(static_products, backend);
        let relay = FormRelayClient::new(config.checkout.form_relay_url.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                store: LocalStore::new(pool.clone()),
                config,
                pool,
                catalog,
                relay,
            }),
        })
    }

    /// Start polling the backend and refreshing the catalog on changes.
    pub fn start_change_feed(&self) {
        if let Some(backend) = &self.inner.config.backend {
            self.inner.catalog.start_change_feed(backend.poll_interval);
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Shared JSON document store (orders, registered users).
    #[must_use]
    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn relay(&self) -> &FormRelayClient {
        &self.inner.relay
    }
}
