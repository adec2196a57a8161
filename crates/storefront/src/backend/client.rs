//! HTTP client for the product collection.

use std::sync::Arc;
use std::time::Duration;

use bazaar_core::{Product, ProductId};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use super::BackendError;
use crate::config::BackendConfig;

/// Request timeout for every backend call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the product backend's document API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    documents_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct DocumentList {
    documents: Vec<Product>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                documents_url: format!(
                    "{}/collections/{}/documents",
                    config.url, config.collection
                ),
                api_key: config.api_key.expose_secret().to_string(),
            }),
        })
    }

    fn document_url(&self, id: &ProductId) -> String {
        format!(
            "{}/{}",
            self.inner.documents_url,
            urlencoding::encode(id.as_str())
        )
    }

    /// Fetch every product document in the collection.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let response = self
            .inner
            .client
            .get(&self.inner.documents_url)
            .header("X-Api-Key", &self.inner.api_key)
            .send()
            .await?;

        let body = check_status(response).await?;
        let list: DocumentList = serde_json::from_str(&body)?;
        Ok(list.documents)
    }

    /// Create a product document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body does not parse.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn create_product(&self, product: &Product) -> Result<Product, BackendError> {
        let response = self
            .inner
            .client
            .post(&self.inner.documents_url)
            .header("X-Api-Key", &self.inner.api_key)
            .json(product)
            .send()
            .await?;

        let body = check_status(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Replace a product document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the body does not parse.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn update_product(&self, product: &Product) -> Result<Product, BackendError> {
        let response = self
            .inner
            .client
            .patch(self.document_url(&product.id))
            .header("X-Api-Key", &self.inner.api_key)
            .json(product)
            .send()
            .await?;

        let body = check_status(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Delete a product document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .delete(self.document_url(id))
            .header("X-Api-Key", &self.inner.api_key)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

/// Read the body, turning non-success statuses into `BackendError::Status`.
async fn check_status(response: reqwest::Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Backend returned non-success status"
        );
        return Err(BackendError::Status {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }

    Ok(body)
}
