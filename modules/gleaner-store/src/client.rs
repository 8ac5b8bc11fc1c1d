//! SPARQL protocol client.
//!
//! The trait is the seam the import pipeline is written against; tests
//! drive the pipeline with an in-memory mock instead of an endpoint.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use crate::bindings::SelectResults;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Malformed results: {0}")]
    Malformed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait SparqlStore: Send + Sync {
    /// Run a SELECT query and return its bindings.
    async fn select(&self, query: &str) -> Result<SelectResults>;

    /// Run an update (INSERT/DELETE). Acknowledgment only.
    async fn update(&self, query: &str) -> Result<()>;
}

/// Max attempts for transient endpoint failures.
const MAX_ATTEMPTS: u32 = 3;
/// Base backoff for retries. Actual delay is base * 2^attempt + jitter.
const RETRY_BASE: Duration = Duration::from_millis(500);

/// Client for a SPARQL 1.1 endpoint over HTTP.
///
/// Owns the transient-retry policy: connection errors and 5xx responses
/// are retried with exponential backoff plus jitter; 4xx responses are
/// returned immediately (the query is wrong, retrying will not help).
#[derive(Clone)]
pub struct HttpSparqlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpSparqlClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, form_key: &str, body: &str, accept: &str) -> Result<String> {
        for attempt in 0..MAX_ATTEMPTS {
            let response = self
                .http
                .post(&self.endpoint)
                .header("Accept", accept)
                .form(&[(form_key, body)])
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .await
                            .context("Failed to read endpoint response body")
                            .map_err(StoreError::Other);
                    }
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_server_error() && attempt + 1 < MAX_ATTEMPTS {
                        let backoff = RETRY_BASE * 2u32.pow(attempt);
                        let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                        warn!(
                            status = status.as_u16(),
                            attempt = attempt + 1,
                            backoff_ms = backoff.as_millis() as u64,
                            "Endpoint error, retrying after backoff"
                        );
                        tokio::time::sleep(backoff + jitter).await;
                        continue;
                    }
                    return Err(StoreError::Endpoint {
                        status: status.as_u16(),
                        body: text,
                    });
                }
                Err(e) if attempt + 1 < MAX_ATTEMPTS => {
                    let backoff = RETRY_BASE * 2u32.pow(attempt);
                    let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "Endpoint unreachable, retrying after backoff"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                }
                Err(e) => {
                    return Err(StoreError::Other(
                        anyhow::Error::new(e).context("SPARQL endpoint unreachable"),
                    ))
                }
            }
        }
        unreachable!("retry loop always returns")
    }
}

#[async_trait]
impl SparqlStore for HttpSparqlClient {
    async fn select(&self, query: &str) -> Result<SelectResults> {
        let body = self
            .post("query", query, "application/sparql-results+json")
            .await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn update(&self, query: &str) -> Result<()> {
        self.post("update", query, "*/*").await?;
        Ok(())
    }
}
