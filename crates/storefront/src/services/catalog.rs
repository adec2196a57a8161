//! Product catalog: bundled static products plus seller products from the backend.
//!
//! Remote products are fetched through a `moka` cache under a single key, so
//! concurrent readers share one in-flight request. Every successful fetch
//! replaces the last snapshot; a failed fetch logs a hint and keeps serving it.
//! After a failure, reads skip the backend for `FAILURE_BACKOFF` and answer
//! from the snapshot straight away. A refresh always tries the backend again.
//!
//! Changes flow through a broadcast feed. Local mutations and the background
//! poller both publish to it, and the feed subscriber answers any change with a
//! full re-fetch.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{DraftError, Product, ProductDraft, ProductId, is_static_id, is_visible};
use moka::future::Cache;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::time::Instant;
use tracing::instrument;

use crate::backend::{BackendClient, BackendError};
use crate::models::CurrentUser;

/// Cache key shared by every remote product fetch.
const PRODUCTS_KEY: &str = "products";

/// Catalog bundled with the binary, used when no catalog path is configured.
const BUNDLED_CATALOG: &str = include_str!("../../content/catalog.json");

const CHANGE_FEED_CAPACITY: usize = 64;

/// How long reads serve the snapshot after a failed fetch.
const FAILURE_BACKOFF: Duration = Duration::from_secs(15);

/// Errors from catalog reads and product mutations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// No backend is configured, so products cannot be changed.
    #[error("product backend is not configured")]
    BackendDisabled,

    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// The actor may not perform this change.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Static catalog products cannot be changed.
    #[error("static products cannot be changed")]
    Immutable,

    /// Seller input failed validation.
    #[error(transparent)]
    Draft(#[from] DraftError),

    /// Static catalog file could not be read.
    #[error("failed to read static catalog: {0}")]
    Io(#[from] std::io::Error),

    /// Static catalog file is not valid product JSON.
    #[error("invalid static catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A change to the remote product list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogChange {
    Created(ProductId),
    Updated(ProductId),
    Deleted(ProductId),
    /// Periodic poll; the remote list may have changed elsewhere.
    Tick,
}

/// Shared product catalog.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    static_products: Vec<Product>,
    backend: Option<BackendClient>,
    cache: Cache<&'static str, Arc<Vec<Product>>>,
    snapshot: RwLock<Arc<Vec<Product>>>,
    /// When the last fetch failed, if it has not succeeded since.
    failed_at: RwLock<Option<Instant>>,
    changes: broadcast::Sender<CatalogChange>,
}

/// Load the static catalog from `path`, or the bundled catalog when `None`.
///
/// Entries whose id is not a static id are skipped.
///
/// # Errors
///
/// Returns `CatalogError::Io` or `CatalogError::Parse` if the file cannot be used.
pub fn load_static_catalog(path: Option<&Path>) -> Result<Vec<Product>, CatalogError> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => BUNDLED_CATALOG.to_string(),
    };
    let products: Vec<Product> = serde_json::from_str(&raw)?;

    Ok(products
        .into_iter()
        .filter(|product| {
            let ok = is_static_id(&product.id);
            if !ok {
                tracing::warn!(
                    product_id = %product.id,
                    "Skipping static product with non-static id"
                );
            }
            ok
        })
        .collect())
}

impl CatalogService {
    /// Create a catalog over the given static products and optional backend.
    #[must_use]
    pub fn new(static_products: Vec<Product>, backend: Option<BackendClient>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        Self {
            inner: Arc::new(CatalogInner {
                static_products,
                backend,
                cache,
                snapshot: RwLock::new(Arc::new(Vec::new())),
                failed_at: RwLock::new(None),
                changes,
            }),
        }
    }

    /// Whether products can be created or changed.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Remote products, from the cache, a fresh fetch, or the last snapshot.
    async fn remote(&self) -> Arc<Vec<Product>> {
        let Some(backend) = &self.inner.backend else {
            return Arc::new(Vec::new());
        };
        if self.in_backoff().await {
            return Arc::clone(&*self.inner.snapshot.read().await);
        }

        let result = self
            .inner
            .cache
            .try_get_with(PRODUCTS_KEY, async {
                let products = Arc::new(backend.list_products().await?);
                *self.inner.snapshot.write().await = Arc::clone(&products);
                tracing::debug!(count = products.len(), "Loaded products from backend");
                Ok::<_, BackendError>(products)
            })
            .await;

        match result {
            Ok(products) => {
                *self.inner.failed_at.write().await = None;
                products
            }
            Err(e) => {
                tracing::warn!(error = %e, hint = e.hint(), "Product fetch failed");
                *self.inner.failed_at.write().await = Some(Instant::now());
                Arc::clone(&*self.inner.snapshot.read().await)
            }
        }
    }

    /// Whether a recent failed fetch means reads should skip the backend.
    async fn in_backoff(&self) -> bool {
        self.inner
            .failed_at
            .read()
            .await
            .is_some_and(|at| at.elapsed() < FAILURE_BACKOFF)
    }

    /// Every product, static first, regardless of visibility.
    pub async fn all(&self) -> Vec<Product> {
        let remote = self.remote().await;
        self.inner
            .static_products
            .iter()
            .chain(remote.iter())
            .cloned()
            .collect()
    }

    /// Products `viewer` may see.
    pub async fn visible(&self, viewer: Option<&CurrentUser>) -> Vec<Product> {
        let viewer = viewer.map(|user| &user.id);
        let mut products = self.all().await;
        products.retain(|product| is_visible(product, viewer));
        products
    }

    /// A single product, if it exists and `viewer` may see it.
    pub async fn get_visible(
        &self,
        id: &ProductId,
        viewer: Option<&CurrentUser>,
    ) -> Option<Product> {
        self.visible(viewer)
            .await
            .into_iter()
            .find(|product| &product.id == id)
    }

    /// Drop the cached list and fetch it again.
    pub async fn refresh(&self) {
        *self.inner.failed_at.write().await = None;
        self.inner.cache.invalidate(PRODUCTS_KEY).await;
        self.remote().await;
    }

    /// Subscribe to catalog changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogChange> {
        self.inner.changes.subscribe()
    }

    fn publish(&self, change: CatalogChange) {
        // No receivers is fine; the cache was already invalidated.
        let _ = self.inner.changes.send(change);
    }

    /// Start the change feed: a subscriber that re-fetches on every change and,
    /// when a backend is configured, a poller that publishes `Tick` every `interval`.
    pub fn start_change_feed(&self, interval: Duration) {
        let mut changes = self.subscribe();
        let catalog = self.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => tracing::debug!(?change, "Catalog change, refetching"),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Catalog feed lagged, refetching");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                catalog.refresh().await;
            }
        });

        if self.inner.backend.is_none() {
            return;
        }

        let catalog = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                catalog.publish(CatalogChange::Tick);
            }
        });
    }

    fn backend(&self) -> Result<&BackendClient, CatalogError> {
        self.inner
            .backend
            .as_ref()
            .ok_or(CatalogError::BackendDisabled)
    }

    async fn remote_product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        if is_static_id(id) {
            return Err(CatalogError::Immutable);
        }
        self.remote()
            .await
            .iter()
            .find(|product| &product.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    async fn after_change(&self, change: CatalogChange) {
        *self.inner.failed_at.write().await = None;
        self.inner.cache.invalidate(PRODUCTS_KEY).await;
        self.publish(change);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// List a new product owned by `actor`. Admin listings are approved immediately.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BackendDisabled` without a backend, or
    /// `CatalogError::Backend` if the request fails.
    #[instrument(skip(self, draft, actor), fields(user_id = %actor.id))]
    pub async fn create(
        &self,
        draft: ProductDraft,
        actor: &CurrentUser,
    ) -> Result<Product, CatalogError> {
        let backend = self.backend()?;
        let product = Product::from_draft(draft, actor.id.clone(), actor.is_admin());
        let created = backend.create_product(&product).await?;

        tracing::info!(product_id = %created.id, approved = created.is_approved, "Product created");
        self.after_change(CatalogChange::Created(created.id.clone())).await;
        Ok(created)
    }

    /// Edit a product. Allowed for its owner and for admins.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Immutable` for static products,
    /// `CatalogError::Forbidden` for other users, or a backend error.
    #[instrument(skip(self, draft, actor), fields(user_id = %actor.id))]
    pub async fn update(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        actor: &CurrentUser,
    ) -> Result<Product, CatalogError> {
        let backend = self.backend()?;
        let mut product = self.remote_product(id).await?;
        if !product.is_owned_by(&actor.id) && !actor.is_admin() {
            return Err(CatalogError::Forbidden(
                "Only the seller or an admin can edit this product",
            ));
        }

        product.apply_draft(draft);
        let updated = backend.update_product(&product).await?;

        tracing::info!(product_id = %id, "Product updated");
        self.after_change(CatalogChange::Updated(id.clone())).await;
        Ok(updated)
    }

    /// Delete a product. Only its owner may delete it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Forbidden` for anyone but the owner, or a backend error.
    #[instrument(skip(self, actor), fields(user_id = %actor.id))]
    pub async fn delete(&self, id: &ProductId, actor: &CurrentUser) -> Result<(), CatalogError> {
        let backend = self.backend()?;
        let product = self.remote_product(id).await?;
        if !product.is_owned_by(&actor.id) {
            return Err(CatalogError::Forbidden("Only the seller can delete this product"));
        }

        backend.delete_product(id).await?;

        tracing::info!(product_id = %id, "Product deleted");
        self.after_change(CatalogChange::Deleted(id.clone())).await;
        Ok(())
    }

    /// Approve a product for public listing. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Forbidden` for non-admins, or a backend error.
    pub async fn approve(
        &self,
        id: &ProductId,
        actor: &CurrentUser,
    ) -> Result<Product, CatalogError> {
        self.moderate(id, actor, Product::approve).await
    }

    /// Reject a product. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Forbidden` for non-admins, or a backend error.
    pub async fn reject(
        &self,
        id: &ProductId,
        actor: &CurrentUser,
    ) -> Result<Product, CatalogError> {
        self.moderate(id, actor, Product::reject).await
    }

    #[instrument(skip(self, actor, decide), fields(user_id = %actor.id))]
    async fn moderate(
        &self,
        id: &ProductId,
        actor: &CurrentUser,
        decide: fn(&mut Product),
    ) -> Result<Product, CatalogError> {
        if !actor.is_admin() {
            return Err(CatalogError::Forbidden("Only admins can moderate products"));
        }
        let backend = self.backend()?;
        let mut product = self.remote_product(id).await?;

        decide(&mut product);
        let updated = backend.update_product(&product).await?;

        tracing::info!(
            product_id = %id,
            approved = updated.is_approved,
            denied = updated.is_denied,
            "Product moderated"
        );
        self.after_change(CatalogChange::Updated(id.clone())).await;
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use bazaar_core::{Email, Role, UserId};
    use secrecy::SecretString;

    fn seller() -> CurrentUser {
        CurrentUser {
            id: UserId::new("seller"),
            name: "Sam".to_string(),
            email: Email::parse("sam@example.com").unwrap(),
            role: Role::User,
        }
    }

    fn draft() -> ProductDraft {
        ProductDraft::parse("Mug", "12.50", "", "Kitchen", "", "").unwrap()
    }

    #[test]
    fn test_bundled_catalog_is_static() {
        let products = load_static_catalog(None).unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| is_static_id(&p.id)));
    }

    #[tokio::test]
    async fn test_static_only_catalog_is_visible_and_read_only() {
        let statics = load_static_catalog(None).unwrap();
        let catalog = CatalogService::new(statics.clone(), None);

        assert!(!catalog.is_writable());
        assert_eq!(catalog.visible(None).await.len(), statics.len());

        let err = catalog.create(draft(), &seller()).await.unwrap_err();
        assert!(matches!(err, CatalogError::BackendDisabled));
    }

    #[tokio::test]
    async fn test_static_products_are_immutable() {
        let statics = load_static_catalog(None).unwrap();
        let id = statics[0].id.clone();
        let catalog = CatalogService::new(statics, None);

        let err = catalog.remote_product(&id).await.unwrap_err();
        assert!(matches!(err, CatalogError::Immutable));
    }

    #[tokio::test]
    async fn test_moderation_requires_admin() {
        let catalog = CatalogService::new(Vec::new(), None);
        let err = catalog
            .approve(&ProductId::new("p1"), &seller())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_failed_fetch_serves_snapshot_without_waiting() {
        let config = BackendConfig {
            url: "http://127.0.0.1:9".to_string(),
            api_key: SecretString::from("k3y-for-the-mock-backend-9f2c"),
            collection: "products".to_string(),
            poll_interval: Duration::from_secs(30),
        };
        let backend = BackendClient::new(&config).unwrap();
        let statics = load_static_catalog(None).unwrap();
        let catalog = CatalogService::new(statics.clone(), Some(backend));

        assert!(!catalog.in_backoff().await);
        catalog.refresh().await;
        assert!(catalog.in_backoff().await);

        let started = Instant::now();
        assert_eq!(catalog.all().await.len(), statics.len());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
