//! PostgreSQL pool setup and health probing.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// How long a health probe may wait before the database counts as down.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Create the catalog connection pool.
///
/// Waiting for a free connection is bounded by the statement timeout, so a
/// saturated pool fails a request instead of queueing it indefinitely.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.statement_timeout)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    tracing::debug!(
        max_connections = config.database_max_connections,
        "catalog pool ready"
    );

    Ok(pool)
}

/// True when the catalog tables answer a trivial query in time.
pub async fn check_health(pool: &PgPool) -> bool {
    let probe = sqlx::query("SELECT 1 FROM card LIMIT 1").execute(pool);
    matches!(
        tokio::time::timeout(HEALTH_PROBE_TIMEOUT, probe).await,
        Ok(Ok(_))
    )
}

/// DDL for the `card` and `cabin` relations the catalog reads.
pub const CATALOG_SCHEMA: &str = include_str!("../schema/catalog.sql");
