//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::db;
use crate::metrics::Metrics;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Catalog query service.
    catalog: CatalogService,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,

    /// Page size when a request has none.
    default_page_limit: i64,

    /// Upper bound on a requested page size.
    max_page_limit: i64,
}

impl AppState {
    /// Connect to the database and build the shared state.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;
        info!("Connected to PostgreSQL");

        Ok(Self::with_pool(db, config))
    }

    /// Build state around an existing pool.
    pub fn with_pool(db: PgPool, config: &Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let catalog = CatalogService::new(db.clone(), config.statement_timeout, metrics.clone());

        Self {
            inner: Arc::new(AppStateInner {
                db,
                catalog,
                metrics,
                default_page_limit: config.default_page_limit,
                max_page_limit: config.max_page_limit,
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the catalog query service.
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Page size used when a listing request has no `limit`.
    pub fn default_page_limit(&self) -> i64 {
        self.inner.default_page_limit
    }

    /// Largest page size a listing request may ask for.
    pub fn max_page_limit(&self) -> i64 {
        self.inner.max_page_limit
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
