//! Prometheus metrics collection.
//!
//! Catalog query counts, latencies and row volumes in Prometheus format.
//! Counter names are registered without the `_total` suffix; the encoder
//! appends it.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Catalog query labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct QueryLabels {
    /// Statement kind: `page`, `ids`, `count`, `card`, `pool`.
    pub kind: String,
    pub outcome: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// Catalog queries by kind and outcome.
    pub catalog_queries: Family<QueryLabels, Counter>,

    /// Catalog query duration, including the transaction round trips.
    pub catalog_query_duration_seconds: Histogram,

    /// Rows returned by successful catalog queries.
    pub catalog_rows_returned: Counter,

    /// Listing requests rejected for an invalid pagination window.
    pub rejected_requests: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let catalog_queries = Family::<QueryLabels, Counter>::default();
        registry.register(
            "catalog_queries",
            "Total catalog queries",
            catalog_queries.clone(),
        );

        let catalog_query_duration_seconds = Histogram::new(exponential_buckets(0.0001, 2.0, 14));
        registry.register(
            "catalog_query_duration_seconds",
            "Catalog query duration in seconds",
            catalog_query_duration_seconds.clone(),
        );

        let catalog_rows_returned = Counter::default();
        registry.register(
            "catalog_rows_returned",
            "Rows returned by catalog queries",
            catalog_rows_returned.clone(),
        );

        let rejected_requests = Counter::default();
        registry.register(
            "catalog_rejected_requests",
            "Listing requests rejected as malformed",
            rejected_requests.clone(),
        );

        Self {
            registry,
            catalog_queries,
            catalog_query_duration_seconds,
            catalog_rows_returned,
            rejected_requests,
        }
    }

    /// Record a completed catalog query.
    pub fn record_query(&self, kind: &str, duration_secs: f64, rows: u64) {
        self.catalog_queries
            .get_or_create(&QueryLabels {
                kind: kind.to_string(),
                outcome: "ok".to_string(),
            })
            .inc();
        self.catalog_query_duration_seconds.observe(duration_secs);
        self.catalog_rows_returned.inc_by(rows);
    }

    /// Record a failed catalog query.
    pub fn record_query_error(&self, kind: &str) {
        self.catalog_queries
            .get_or_create(&QueryLabels {
                kind: kind.to_string(),
                outcome: "error".to_string(),
            })
            .inc();
    }

    /// Record a rejected listing request.
    pub fn record_rejected(&self) {
        self.rejected_requests.inc();
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails.
    /// The `fmt::Write` impl for `String` is infallible, and all metric
    /// labels use derived `EncodeLabelSet` impls.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        // Prometheus encoding to String buffer is infallible
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}
