//! Transport seam between the sync engine and the remote authority.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::wire::{PullResponse, ReadingUpload};

/// What the remote did with a pushed reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored as sent (insert or idempotent overwrite by id).
    Accepted,
    /// The remote's (`plant_id`, `meter_id`, second-truncated `measured_at`)
    /// uniqueness constraint folded this push into an existing row. Benign:
    /// the reading is on the server, just not as a new row.
    Folded,
}

/// Remote endpoint pair used by the sync engine.
///
/// Implemented by [`HttpTransport`] in production and by in-process fakes in
/// tests, so protocol semantics are testable without a network.
#[async_trait]
pub trait ReadingTransport: Send + Sync {
    /// Transmit one reading to the ingestion endpoint.
    async fn push(&self, reading: &ReadingUpload) -> Result<PushOutcome>;

    /// Request readings the remote observed after `last_pulled_at`, at most
    /// `limit` of them. Idempotent for a fixed cursor value.
    async fn pull(&self, last_pulled_at: i64, limit: u32) -> Result<PullResponse>;
}

/// HTTP transport against the backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given base URL (e.g.
    /// `https://api.example.com`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(SyncError::Request)?;
        Self::with_client(base_url, client)
    }

    /// Create a transport with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        // Normalize URL (remove trailing slash)
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SyncError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn error_from(response: reqwest::Response) -> SyncError {
        let status = response.status();
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| status.to_string());

        SyncError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ReadingTransport for HttpTransport {
    async fn push(&self, reading: &ReadingUpload) -> Result<PushOutcome> {
        let url = format!("{}/api/ph-ec-readings", self.base_url);
        debug!(id = %reading.id, "pushing reading");

        let response = self
            .client
            .post(&url)
            .json(reading)
            .send()
            .await
            .map_err(|e| SyncError::Connectivity {
                url: url.clone(),
                source: e,
            })?;

        match response.status() {
            status if status.is_success() => Ok(PushOutcome::Accepted),
            StatusCode::CONFLICT => Ok(PushOutcome::Folded),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn pull(&self, last_pulled_at: i64, limit: u32) -> Result<PullResponse> {
        let url = format!(
            "{}/api/ph-ec-readings/sync?last_pulled_at={}&limit={}",
            self.base_url, last_pulled_at, limit
        );
        debug!(last_pulled_at, limit, "pulling readings");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::Connectivity {
                url: url.clone(),
                source: e,
            })?;

        if response.status().is_success() {
            response.json().await.map_err(SyncError::Request)
        } else {
            Err(Self::error_from(response).await)
        }
    }
}
