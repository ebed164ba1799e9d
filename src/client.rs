//! HTTP client for the vegetable stock API.
//!
//! Mirrors what the web frontend does: plain CRUD calls that surface the
//! server's `{error}` message verbatim, catalog reads that retry with a
//! fixed delay and fall back to a cached copy, and the client-driven
//! carry-forward of yesterday's leftovers.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::{Config, DEFAULT_FETCH_RETRIES, DEFAULT_RETRY_DELAY_MS};
use crate::dates::{format_stock_date, PREVIOUS_DAY};
use crate::models::{DailyStock, StockEntry, Vegetable, VegetableDraft, VegetableId};

/// Errors that can occur during API client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or undecodable response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success status, with the server's error message
    #[error("{message} (status {status})")]
    Server { status: u16, message: String },
    /// Carry-forward found nothing with quantity left
    #[error("No remaining stock from the previous day")]
    NothingToCarry,
}

impl ClientError {
    /// Transport errors and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            ClientError::NothingToCarry => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Fixed-delay retry policy for catalog reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_FETCH_RETRIES,
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Catalog as returned by [`ApiClient::list_vegetables`].
#[derive(Debug, Clone)]
pub struct CatalogFetch {
    pub vegetables: Vec<Vegetable>,
    /// True when the server could not be reached and the cache was used.
    pub from_cache: bool,
}

/// `{id, message}` reply to a write.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteReply {
    pub id: String,
    pub message: String,
}

/// `{message}` reply to an update or delete.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageReply {
    pub message: String,
}

/// Reply to `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
    /// The server's current date.
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CarryForwardReport {
    /// Date the entries were merged into.
    pub date: String,
    pub carried: Vec<StockEntry>,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

#[derive(Serialize)]
struct StockRequest<'a> {
    vegetables: &'a [StockEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

/// Client for the vegetable stock HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
    cache_path: Option<PathBuf>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            retry: RetryPolicy::default(),
            cache_path: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.server_url.value.clone())
            .with_retry(RetryPolicy {
                attempts: config.fetch_retries.value,
                delay: config.retry_delay(),
            })
            .with_cache(config.catalog_cache_path.value.clone())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorReply>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.delete(self.url(path)).send().await?;
        Self::decode(response).await
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        self.get("/health").await
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Fetches the catalog, retrying with a fixed delay.
    ///
    /// A successful fetch refreshes the cache file. Once every attempt has
    /// failed, the cached copy is returned if there is one.
    pub async fn list_vegetables(&self) -> Result<CatalogFetch, ClientError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;

        let err = loop {
            match self.get::<Vec<Vegetable>>("/vegetables").await {
                Ok(vegetables) => {
                    self.write_cache(&vegetables);
                    return Ok(CatalogFetch {
                        vegetables,
                        from_cache: false,
                    });
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        "Fetching vegetables failed (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => break e,
            }
        };

        match self.read_cache() {
            Some(vegetables) => {
                tracing::warn!("Using cached vegetables after error: {}", err);
                Ok(CatalogFetch {
                    vegetables,
                    from_cache: true,
                })
            }
            None => Err(err),
        }
    }

    fn write_cache(&self, vegetables: &[Vegetable]) {
        let Some(path) = &self.cache_path else {
            return;
        };
        if let Err(e) = write_cache_file(path, vegetables) {
            tracing::warn!("Failed to write catalog cache {}: {}", path.display(), e);
        }
    }

    fn read_cache(&self) -> Option<Vec<Vegetable>> {
        let path = self.cache_path.as_ref()?;
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read catalog cache {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(vegetables) => Some(vegetables),
            Err(e) => {
                tracing::warn!("Ignoring corrupt catalog cache {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn get_vegetable(&self, id: &VegetableId) -> Result<Vegetable, ClientError> {
        self.get(&format!("/vegetables/{}", id)).await
    }

    pub async fn create_vegetable(&self, draft: &VegetableDraft) -> Result<WriteReply, ClientError> {
        let response = self
            .http
            .post(self.url("/vegetables"))
            .json(draft)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn update_vegetable(
        &self,
        id: &VegetableId,
        draft: &VegetableDraft,
    ) -> Result<MessageReply, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/vegetables/{}", id)))
            .json(draft)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_vegetable(&self, id: &VegetableId) -> Result<MessageReply, ClientError> {
        self.delete(&format!("/vegetables/{}", id)).await
    }

    // ------------------------------------------------------------------
    // Daily stock
    // ------------------------------------------------------------------

    /// Merge-or-create; without a date the server uses its own today.
    pub async fn add_stock(
        &self,
        date: Option<NaiveDate>,
        entries: &[StockEntry],
    ) -> Result<WriteReply, ClientError> {
        let body = StockRequest {
            vegetables: entries,
            date: date.map(format_stock_date),
        };
        let response = self
            .http
            .post(self.url("/daily-stock"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn replace_stock(
        &self,
        date: NaiveDate,
        entries: &[StockEntry],
    ) -> Result<WriteReply, ClientError> {
        let body = StockRequest {
            vegetables: entries,
            date: None,
        };
        let response = self
            .http
            .put(self.url(&format!("/daily-stock/{}", format_stock_date(date))))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// `param` is a `YYYY-MM-DD` date or `previous-day`.
    pub async fn get_stock(&self, param: &str) -> Result<DailyStock, ClientError> {
        self.get(&format!("/daily-stock/{}", param)).await
    }

    pub async fn list_stock(&self) -> Result<Vec<DailyStock>, ClientError> {
        self.get("/daily-stock").await
    }

    pub async fn delete_stock(&self, date: NaiveDate) -> Result<MessageReply, ClientError> {
        self.delete(&format!("/daily-stock/{}", format_stock_date(date)))
            .await
    }

    pub async fn remove_stock_entry(
        &self,
        date: NaiveDate,
        id: &VegetableId,
    ) -> Result<MessageReply, ClientError> {
        self.delete(&format!(
            "/daily-stock/{}/vegetable/{}",
            format_stock_date(date),
            id
        ))
        .await
    }

    /// Carries yesterday's leftovers into `target` (server today if `None`).
    ///
    /// Only entries with quantity left are carried. A non-empty `selection`
    /// restricts the carry to those ids.
    pub async fn carry_forward(
        &self,
        target: Option<NaiveDate>,
        selection: &[VegetableId],
    ) -> Result<CarryForwardReport, ClientError> {
        let previous = self.get_stock(PREVIOUS_DAY).await?;

        let carried: Vec<StockEntry> = previous
            .remaining()
            .filter(|e| selection.is_empty() || selection.contains(&e.id))
            .cloned()
            .collect();
        if carried.is_empty() {
            return Err(ClientError::NothingToCarry);
        }

        tracing::info!(
            "Carrying forward {} vegetable(s) from {}",
            carried.len(),
            previous.date
        );
        let reply = self.add_stock(target, &carried).await?;

        Ok(CarryForwardReport {
            date: reply.id,
            carried,
            message: reply.message,
        })
    }
}

fn write_cache_file(path: &Path, vegetables: &[Vegetable]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(vegetables)?;
    std::fs::write(path, json)
}
