//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `WHATSAPP_NUMBER` - Number that receives checkout messages (any formatting)
//!
//! ## Optional
//! - `STOREFRONT_DATABASE_URL` - `SQLite` URL (default: `sqlite://bazaar.db?mode=rwc`)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STORE_NAME` - Name used in page titles and order messages (default: Bazaar)
//! - `STOREFRONT_CURRENCY` - ISO currency code for prices (default: USD)
//! - `STOREFRONT_CATALOG_PATH` - Static catalog JSON (default: bundled catalog)
//! - `FORM_RELAY_URL` - Form relay endpoint for order and newsletter emails
//! - `BACKEND_URL` - Product backend base URL (static catalog only when unset)
//! - `BACKEND_API_KEY` - Product backend API key (required with `BACKEND_URL`)
//! - `BACKEND_COLLECTION` - Product collection id (default: products)
//! - `BACKEND_POLL_SECONDS` - Interval between change checks (default: 30)
//! - `ADMIN_EMAILS` - Comma-separated emails that sign up as admins
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use bazaar_core::{CurrencyCode, Email};
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `SQLite` database URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Store name shown in titles and order messages
    pub store_name: String,
    /// Currency used to format prices
    pub currency: CurrencyCode,
    /// Static catalog file, or `None` for the bundled catalog
    pub catalog_path: Option<PathBuf>,
    /// Checkout handoff configuration
    pub checkout: CheckoutConfig,
    /// Product backend, or `None` to serve only the static catalog
    pub backend: Option<BackendConfig>,
    /// Emails that receive the admin role at signup
    pub admin_emails: Vec<Email>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Where checkout orders are sent.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// WhatsApp number, digits only
    pub whatsapp_number: String,
    /// Form relay endpoint; relay posts are skipped when unset
    pub form_relay_url: Option<String>,
}

/// Product backend-as-a-service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, without a trailing slash
    pub url: String,
    /// API key sent with every request
    pub api_key: SecretString,
    /// Collection holding product documents
    pub collection: String,
    /// How often the change poller publishes a refresh
    pub poll_interval: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("collection", &self.collection)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the backend API key fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_env_or_default(
            "STOREFRONT_DATABASE_URL",
            "sqlite://bazaar.db?mode=rwc",
        ));
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let store_name = get_env_or_default("STOREFRONT_STORE_NAME", "Bazaar");
        let currency = get_env_or_default("STOREFRONT_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_CURRENCY".to_string(), e))?;
        let catalog_path = get_optional_env("STOREFRONT_CATALOG_PATH").map(PathBuf::from);

        let checkout = CheckoutConfig::from_env()?;
        let backend = BackendConfig::from_env()?;
        let admin_emails = parse_admin_emails(&get_env_or_default("ADMIN_EMAILS", ""))?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            store_name,
            currency,
            catalog_path,
            checkout,
            backend,
            admin_emails,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether this email signs up with the admin role.
    #[must_use]
    pub fn is_admin_email(&self, email: &Email) -> bool {
        self.admin_emails.contains(email)
    }
}

impl CheckoutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("WHATSAPP_NUMBER")?;
        let whatsapp_number = digits_only(&raw);
        if whatsapp_number.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "WHATSAPP_NUMBER".to_string(),
                "must contain digits".to_string(),
            ));
        }

        Ok(Self {
            whatsapp_number,
            form_relay_url: get_optional_env("FORM_RELAY_URL"),
        })
    }
}

impl BackendConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(url) = get_optional_env("BACKEND_URL") else {
            return Ok(None);
        };

        Ok(Some(Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: get_validated_secret("BACKEND_API_KEY")?,
            collection: get_env_or_default("BACKEND_COLLECTION", "products"),
            poll_interval: Duration::from_secs(parse_env("BACKEND_POLL_SECONDS", "30")?),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Strip everything but ASCII digits (wa.me wants the bare international number).
pub(crate) fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn parse_admin_emails(raw: &str) -> Result<Vec<Email>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Email::parse(s)
                .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_EMAILS".to_string(), e.to_string()))
        })
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
