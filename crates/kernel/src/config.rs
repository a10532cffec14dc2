//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Per-statement timeout for catalog queries (default: 10s).
    pub statement_timeout: Duration,

    /// Page size when a listing request has no `limit` (default: 12).
    pub default_page_limit: i64,

    /// Largest `limit` a listing request may ask for (default: 100).
    pub max_page_limit: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "3000")
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let statement_timeout_secs: u64 = var("STATEMENT_TIMEOUT_SECS", "10")
            .parse()
            .context("STATEMENT_TIMEOUT_SECS must be a valid u64")?;

        let default_page_limit: i64 = var("DEFAULT_PAGE_LIMIT", "12")
            .parse()
            .context("DEFAULT_PAGE_LIMIT must be a valid integer")?;

        let max_page_limit: i64 = var("MAX_PAGE_LIMIT", "100")
            .parse()
            .context("MAX_PAGE_LIMIT must be a valid integer")?;

        anyhow::ensure!(
            statement_timeout_secs > 0,
            "STATEMENT_TIMEOUT_SECS must be greater than zero"
        );
        anyhow::ensure!(
            default_page_limit >= 1,
            "DEFAULT_PAGE_LIMIT must be at least 1"
        );
        anyhow::ensure!(
            max_page_limit >= default_page_limit,
            "MAX_PAGE_LIMIT must not be smaller than DEFAULT_PAGE_LIMIT"
        );

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            cors_allowed_origins,
            statement_timeout: Duration::from_secs(statement_timeout_secs),
            default_page_limit,
            max_page_limit,
        })
    }
}
