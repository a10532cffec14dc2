//! HTTP route handlers.

pub mod cards;
pub mod health;
pub mod metrics;
pub mod wizard;

use axum::Router;

use crate::state::AppState;

/// All application routes, without middleware layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(cards::router())
        .merge(wizard::router())
        .merge(health::router())
        .merge(metrics::router())
}
