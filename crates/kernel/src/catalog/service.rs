//! Catalog query service.
//!
//! Executes statements from [`CatalogQueryBuilder`] against PostgreSQL. Each
//! call runs in its own transaction so `SET LOCAL statement_timeout` bounds
//! it; a timeout surfaces as an ordinary query error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::{Arguments, Postgres, Transaction};
use tracing::debug;

use super::filter::FilterModel;
use super::query_builder::{
    BuiltQuery, CatalogQueryBuilder, DeckPool, SqlParam, build_card_by_id, build_pool,
};
use crate::metrics::Metrics;
use crate::models::Card;

/// Runs catalog queries.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    statement_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl CatalogService {
    pub fn new(pool: PgPool, statement_timeout: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            pool,
            statement_timeout,
            metrics,
        }
    }

    /// One page of matching cards, in listing order.
    pub async fn fetch_page(&self, filters: &FilterModel) -> Result<Vec<Card>> {
        let built = CatalogQueryBuilder::new(filters)
            .build_page()
            .context("failed to build page query")?;
        self.fetch_cards("page", &built).await
    }

    /// Every matching card id, in the same order as [`fetch_page`](Self::fetch_page).
    pub async fn fetch_all_ids(&self, filters: &FilterModel) -> Result<Vec<String>> {
        let built = CatalogQueryBuilder::new(filters)
            .build_ids()
            .context("failed to build id query")?;

        let started = Instant::now();
        let result = async {
            let args = to_arguments(&built.params)?;
            let mut tx = self.begin().await?;
            let ids = sqlx::query_scalar_with::<Postgres, String, _>(&built.sql, args)
                .fetch_all(&mut *tx)
                .await
                .context("failed to execute id query")?;
            tx.commit()
                .await
                .context("failed to commit query transaction")?;
            Ok::<_, anyhow::Error>(ids)
        }
        .await;

        self.observe("ids", &built, started, result.as_ref().map(Vec::len).ok());
        result
    }

    /// Number of cards matching the filters.
    pub async fn count(&self, filters: &FilterModel) -> Result<i64> {
        let built = CatalogQueryBuilder::new(filters)
            .build_count()
            .context("failed to build count query")?;

        let started = Instant::now();
        let result = async {
            let args = to_arguments(&built.params)?;
            let mut tx = self.begin().await?;
            let total = sqlx::query_scalar_with::<Postgres, i64, _>(&built.sql, args)
                .fetch_one(&mut *tx)
                .await
                .context("failed to execute count query")?;
            tx.commit()
                .await
                .context("failed to commit query transaction")?;
            Ok::<_, anyhow::Error>(total)
        }
        .await;

        self.observe("count", &built, started, result.as_ref().ok().map(|_| 1));
        result
    }

    /// Every matching card, unpaginated.
    pub async fn fetch_unpaged(&self, filters: &FilterModel) -> Result<Vec<Card>> {
        let built = CatalogQueryBuilder::new(filters)
            .build_unpaged()
            .context("failed to build unpaged query")?;
        self.fetch_cards("unpaged", &built).await
    }

    /// Look up one card by id.
    pub async fn get_card(&self, id: &str) -> Result<Option<Card>> {
        let built = build_card_by_id(id).context("failed to build card query")?;

        let started = Instant::now();
        let result = async {
            let args = to_arguments(&built.params)?;
            let mut tx = self.begin().await?;
            let card = sqlx::query_as_with::<_, Card, _>(&built.sql, args)
                .fetch_optional(&mut *tx)
                .await
                .context("failed to fetch card by id")?;
            tx.commit()
                .await
                .context("failed to commit query transaction")?;
            Ok::<_, anyhow::Error>(card)
        }
        .await;

        self.observe(
            "card",
            &built,
            started,
            result.as_ref().ok().map(|c| usize::from(c.is_some())),
        );
        result
    }

    /// A fixed deck-wizard pool.
    pub async fn fetch_pool(&self, pool: DeckPool) -> Result<Vec<Card>> {
        let built = build_pool(pool).context("failed to build pool query")?;
        self.fetch_cards("pool", &built).await
    }

    async fn fetch_cards(&self, kind: &'static str, built: &BuiltQuery) -> Result<Vec<Card>> {
        let started = Instant::now();
        let result = async {
            let args = to_arguments(&built.params)?;
            let mut tx = self.begin().await?;
            let rows = sqlx::query_as_with::<_, Card, _>(&built.sql, args)
                .fetch_all(&mut *tx)
                .await
                .with_context(|| format!("failed to execute {kind} query"))?;
            tx.commit()
                .await
                .context("failed to commit query transaction")?;
            Ok::<_, anyhow::Error>(rows)
        }
        .await;

        self.observe(kind, built, started, result.as_ref().map(Vec::len).ok());

        if let Ok(rows) = &result {
            for card in rows.iter().filter(|c| c.has_rarity_conflict()) {
                tracing::warn!(
                    card_id = %card.id,
                    flags = card.rarity_flag_count(),
                    "card has overlapping rarity flags"
                );
            }
        }

        result
    }

    /// Begin a transaction with the statement timeout applied.
    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        sqlx::query(&format!(
            "SET LOCAL statement_timeout = '{}ms'",
            self.statement_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .context("failed to set statement timeout")?;

        Ok(tx)
    }

    fn observe(
        &self,
        kind: &'static str,
        built: &BuiltQuery,
        started: Instant,
        rows: Option<usize>,
    ) {
        let elapsed = started.elapsed();
        match rows {
            Some(rows) => {
                debug!(
                    kind,
                    sql = %built.sql,
                    params = built.params.len(),
                    rows,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "catalog query executed"
                );
                self.metrics
                    .record_query(kind, elapsed.as_secs_f64(), rows as u64);
            }
            None => {
                self.metrics.record_query_error(kind);
            }
        }
    }
}

/// Bind parameters in placeholder order.
fn to_arguments(params: &[SqlParam]) -> Result<PgArguments> {
    let mut args = PgArguments::default();
    for param in params {
        let bound = match param {
            SqlParam::Text(v) => args.add(v.clone()),
            SqlParam::Int(v) => args.add(*v),
            SqlParam::BigInt(v) => args.add(*v),
            SqlParam::Bool(v) => args.add(*v),
        };
        bound.map_err(|e| anyhow::anyhow!("failed to bind query parameter: {e}"))?;
    }
    Ok(args)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn binds_every_param() {
        let args = to_arguments(&[
            SqlParam::Text("%avian%".to_string()),
            SqlParam::Bool(true),
            SqlParam::Int(3),
            SqlParam::BigInt(12),
        ])
        .unwrap();
        assert_eq!(args.len(), 4);
    }
}
