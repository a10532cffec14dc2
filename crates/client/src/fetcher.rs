//! Catalog API access.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use codex_kernel::Card;
use codex_kernel::catalog::{FilterModel, to_query_string};

/// Why a fetch produced no rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Source of catalog rows.
#[async_trait]
pub trait CardFetcher: Send + Sync {
    /// One page of cards for `filters`, honoring its `offset`/`limit`.
    async fn fetch_page(&self, filters: &FilterModel) -> Result<Vec<Card>, FetchError>;

    /// Every matching id in listing order.
    async fn fetch_all_ids(&self, filters: &FilterModel) -> Result<Vec<String>, FetchError>;
}

/// [`CardFetcher`] over the HTTP listing API.
#[derive(Debug, Clone)]
pub struct HttpCardFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCardFetcher {
    /// Build a fetcher whose requests are bounded by `timeout`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str, query: &str) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        url.set_query((!query.is_empty()).then_some(query));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        tracing::debug!(%url, "catalog request");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CardFetcher for HttpCardFetcher {
    async fn fetch_page(&self, filters: &FilterModel) -> Result<Vec<Card>, FetchError> {
        let url = self.endpoint("api/cards", &to_query_string(filters, true))?;
        self.get_json(url).await
    }

    async fn fetch_all_ids(&self, filters: &FilterModel) -> Result<Vec<String>, FetchError> {
        let url = self.endpoint("api/cards/ids", &to_query_string(filters, false))?;
        self.get_json(url).await
    }
}
