//! Client configuration.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

use codex_kernel::catalog::DEFAULT_LIMIT;

/// Quiet period before free-text input is folded into the filters.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the catalog API (default: http://127.0.0.1:3000).
    pub base_url: Url,

    /// Rows requested per page (default: 12).
    pub page_limit: i64,

    /// Search debounce window (default: 400ms).
    pub debounce: Duration,

    /// Bound on a single request (default: 10s).
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        // Literal URL, always parses.
        #[allow(clippy::expect_used)]
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid");

        Self {
            base_url,
            page_limit: DEFAULT_LIMIT,
            debounce: SEARCH_DEBOUNCE,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Load configuration from `CODEX_API_URL`, `CODEX_PAGE_LIMIT` and
    /// `CODEX_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("CODEX_API_URL") {
            config.base_url = Url::parse(&raw).context("CODEX_API_URL must be a valid URL")?;
            // Endpoint paths are joined relative to the base.
            if !config.base_url.path().ends_with('/') {
                let path = format!("{}/", config.base_url.path());
                config.base_url.set_path(&path);
            }
        }

        if let Ok(raw) = env::var("CODEX_PAGE_LIMIT") {
            config.page_limit = raw
                .parse()
                .context("CODEX_PAGE_LIMIT must be a valid integer")?;
            anyhow::ensure!(config.page_limit >= 1, "CODEX_PAGE_LIMIT must be at least 1");
        }

        if let Ok(raw) = env::var("CODEX_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .context("CODEX_REQUEST_TIMEOUT_SECS must be a valid u64")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
