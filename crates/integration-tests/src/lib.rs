//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! Each test starts its own storefront on an ephemeral port with an
//! in-memory `SQLite` database, and talks to it through a cookie-keeping
//! `reqwest` client. Tests that need a product backend start a
//! [`MockBackend`] the same way.
//!
//! # Test Categories
//!
//! - `storefront` - Browsing, cart, wishlist and checkout
//! - `auth` - Signup, login, profile and logout
//! - `catalog_backend` - Seller listings, moderation and backend failures

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use bazaar_core::{CurrencyCode, Email, Product};
use bazaar_storefront::config::{BackendConfig, CheckoutConfig, StorefrontConfig};
use bazaar_storefront::{app, db, state::AppState};
use reqwest::Client;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Admin address used by the tests.
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// WhatsApp number used by the tests.
pub const WHATSAPP_NUMBER: &str = "15550100999";

/// A loopback port nothing listens on, so relay posts fail fast.
pub const UNREACHABLE_RELAY: &str = "http://127.0.0.1:9/relay";

/// Storefront configuration for tests: no backend, relay unreachable.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost".to_owned(),
        store_name: "Bazaar".to_owned(),
        currency: CurrencyCode::USD,
        catalog_path: None,
        checkout: CheckoutConfig {
            whatsapp_number: WHATSAPP_NUMBER.to_owned(),
            form_relay_url: Some(UNREACHABLE_RELAY.to_owned()),
        },
        backend: None,
        admin_emails: vec![Email::parse(ADMIN_EMAIL).expect("valid admin email")],
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A running storefront.
pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    /// Follows redirects and keeps the session cookie.
    pub client: Client,
}

impl TestApp {
    /// Start a storefront with the default test configuration.
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    /// Start a storefront with `config`.
    pub async fn spawn_with(config: StorefrontConfig) -> Self {
        let pool = db::create_memory_pool()
            .await
            .expect("Failed to create in-memory pool");
        db::migrate(&pool).await.expect("Failed to run migrations");

        let state = AppState::new(config, pool).expect("Failed to create application state");
        let router = app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            client: Self::new_client(),
        }
    }

    /// A fresh visitor with an empty cookie jar.
    #[must_use]
    pub fn new_client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Another visitor of the same storefront, with their own cookie jar.
    #[must_use]
    pub fn visitor(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            state: self.state.clone(),
            client: Self::new_client(),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` and return the final status and body.
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed");
        let status = resp.status();
        (status, resp.text().await.expect("Failed to read body"))
    }

    /// POST a form to `path`, following redirects, and return the final
    /// status and body.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> (reqwest::StatusCode, String) {
        let resp = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed");
        let status = resp.status();
        (status, resp.text().await.expect("Failed to read body"))
    }

    /// Sign up and stay logged in.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> String {
        let (status, body) = self
            .post_form(
                "/auth",
                &[
                    ("screen", "signup"),
                    ("name", name),
                    ("email", email),
                    ("phone", "555 0100"),
                    ("password", password),
                    ("confirm_password", password),
                ],
            )
            .await;
        assert!(status.is_success(), "signup failed with {status}");
        body
    }
}

/// In-memory stand-in for the product backend.
#[derive(Clone, Default)]
pub struct MockBackend {
    products: Arc<Mutex<Vec<Product>>>,
    failing: Arc<AtomicBool>,
}

/// Collection id the mock serves.
pub const MOCK_COLLECTION: &str = "products";

impl MockBackend {
    /// Start the mock on an ephemeral port and return it with its base URL.
    pub async fn spawn() -> (Self, String) {
        let backend = Self::default();
        let router = Router::new()
            .route(
                "/collections/{collection}/documents",
                get(list_documents).post(create_document),
            )
            .route(
                "/collections/{collection}/documents/{id}",
                patch(update_document).delete(delete_document),
            )
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock backend failed");
        });

        (backend, format!("http://{addr}"))
    }

    /// Storefront configuration pointing at this mock.
    #[must_use]
    pub fn config(url: &str) -> StorefrontConfig {
        StorefrontConfig {
            backend: Some(BackendConfig {
                url: url.to_owned(),
                api_key: SecretString::from("k3y-for-the-mock-backend-9f2c"),
                collection: MOCK_COLLECTION.to_owned(),
                poll_interval: Duration::from_secs(3600),
            }),
            ..test_config()
        }
    }

    /// Make every request fail with 500 (or recover).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of the stored documents.
    pub async fn products(&self) -> Vec<Product> {
        self.products.lock().await.clone()
    }

    fn check(&self) -> Result<(), Response> {
        if self.failing.load(Ordering::SeqCst) {
            Err((StatusCode::INTERNAL_SERVER_ERROR, "backend down").into_response())
        } else {
            Ok(())
        }
    }
}

async fn list_documents(
    State(backend): State<MockBackend>,
    Path(_collection): Path<String>,
) -> Response {
    if let Err(resp) = backend.check() {
        return resp;
    }
    let documents = backend.products.lock().await.clone();
    Json(serde_json::json!({ "documents": documents })).into_response()
}

async fn create_document(
    State(backend): State<MockBackend>,
    Path(_collection): Path<String>,
    Json(product): Json<Product>,
) -> Response {
    if let Err(resp) = backend.check() {
        return resp;
    }
    backend.products.lock().await.push(product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn update_document(
    State(backend): State<MockBackend>,
    Path((_collection, id)): Path<(String, String)>,
    Json(product): Json<Product>,
) -> Response {
    if let Err(resp) = backend.check() {
        return resp;
    }
    let mut products = backend.products.lock().await;
    match products.iter_mut().find(|p| p.id.as_str() == id) {
        Some(stored) => {
            *stored = product.clone();
            Json(product).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_document(
    State(backend): State<MockBackend>,
    Path((_collection, id)): Path<(String, String)>,
) -> Response {
    if let Err(resp) = backend.check() {
        return resp;
    }
    let mut products = backend.products.lock().await;
    let before = products.len();
    products.retain(|p| p.id.as_str() != id);
    if products.len() == before {
        StatusCode::NOT_FOUND.into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}
