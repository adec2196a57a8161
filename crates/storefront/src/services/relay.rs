//! Form relay client.
//!
//! The relay turns a POSTed JSON object into an email to the store owner. It is
//! used for order notifications and newsletter signups. Delivery is best-effort:
//! messages are sent from a spawned task, failures are logged, nothing retries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when posting to the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Relay answered with a non-success status.
    #[error("relay returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// One relay submission: a subject plus flat string fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayMessage {
    #[serde(rename = "_subject")]
    pub subject: String,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, String>,
}

impl RelayMessage {
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.insert(name, value.into());
        self
    }
}

/// Client for the form relay. Disabled when no endpoint is configured.
#[derive(Clone)]
pub struct FormRelayClient {
    inner: Arc<FormRelayInner>,
}

struct FormRelayInner {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl FormRelayClient {
    /// Create a relay client posting to `endpoint`, or a disabled one.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Http` if the HTTP client fails to build.
    pub fn new(endpoint: Option<String>) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(FormRelayInner { client, endpoint }),
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.endpoint.is_some()
    }

    /// Post a message and wait for the answer.
    ///
    /// A disabled relay accepts every message without sending it.
    ///
    /// # Errors
    ///
    /// Returns `RelayError` if the request fails or the relay rejects it.
    pub async fn send(&self, message: &RelayMessage) -> Result<(), RelayError> {
        let Some(endpoint) = &self.inner.endpoint else {
            tracing::debug!(subject = %message.subject, "Form relay disabled, message dropped");
            return Ok(());
        };

        let response = self.inner.client.post(endpoint).json(message).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(())
    }

    /// Send a message in the background. Failures are logged and dropped.
    pub fn dispatch(&self, message: RelayMessage) {
        let relay = self.clone();
        tokio::spawn(async move {
            match relay.send(&message).await {
                Ok(()) => tracing::debug!(subject = %message.subject, "Relay message sent"),
                Err(e) => tracing::warn!(
                    error = %e,
                    subject = %message.subject,
                    "Relay message failed"
                ),
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_flat_with_subject() {
        let message = RelayMessage::new("New order")
            .field("name", "Ada")
            .field("total", "$35.00");

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["_subject"], "New order");
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["total"], "$35.00");
    }

    #[tokio::test]
    async fn test_disabled_relay_accepts_silently() {
        let relay = FormRelayClient::new(None).unwrap();
        assert!(!relay.is_enabled());
        relay.send(&RelayMessage::new("noop")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_relay_errors() {
        // Port 9 (discard) on localhost is closed in test environments.
        let relay = FormRelayClient::new(Some("http://127.0.0.1:9/relay".to_string())).unwrap();
        assert!(relay.send(&RelayMessage::new("order")).await.is_err());
    }
}
