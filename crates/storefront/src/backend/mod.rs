//! Product backend-as-a-service client.
//!
//! # Architecture
//!
//! - Products are JSON documents in a single collection
//! - The backend is the source of truth for seller listings; the storefront
//!   keeps an in-memory snapshot (see [`crate::services::catalog`])
//! - Every request carries the `X-Api-Key` header
//!
//! # Endpoints
//!
//! ```text
//! GET    {url}/collections/{collection}/documents       -> { "documents": [...] }
//! POST   {url}/collections/{collection}/documents       -> Product
//! PATCH  {url}/collections/{collection}/documents/{id}  -> Product
//! DELETE {url}/collections/{collection}/documents/{id}
//! ```

mod client;

pub use client::BackendClient;

use thiserror::Error;

/// Errors that can occur when talking to the product backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not the expected JSON.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BackendError {
    /// Operator hint for a failed request, logged next to the error.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::Status { status: 401 | 403, .. } => {
                "check that the API key may read the product collection"
            }
            Self::Status { status: 404, .. } => "check BACKEND_URL and BACKEND_COLLECTION",
            Self::Parse(_) => "backend documents do not match the product shape",
            _ => "backend unreachable or failing, serving the last loaded products",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hints_by_status() {
        let forbidden = BackendError::Status {
            status: 403,
            message: String::new(),
        };
        assert!(forbidden.hint().contains("API key"));

        let missing = BackendError::Status {
            status: 404,
            message: String::new(),
        };
        assert!(missing.hint().contains("BACKEND_COLLECTION"));

        let other = BackendError::Status {
            status: 500,
            message: String::new(),
        };
        assert!(other.hint().contains("last loaded"));
    }
}
