//! Deck wizard card pools.
//!
//! Read-only lists the deck builder draws from. None of these are paginated.

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    routing::get,
};

use crate::catalog::{DeckPool, parse_filters};
use crate::error::AppResult;
use crate::models::Card;
use crate::state::AppState;

/// Create the wizard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wizard/lanterns", get(lanterns))
        .route("/api/wizard/trails", get(trails))
        .route("/api/wizard/main-deck", get(main_deck))
        .route("/api/wizard/companions", get(companions))
}

async fn lanterns(State(state): State<AppState>) -> AppResult<Json<Vec<Card>>> {
    Ok(Json(state.catalog().fetch_pool(DeckPool::Lanterns).await?))
}

async fn trails(State(state): State<AppState>) -> AppResult<Json<Vec<Card>>> {
    Ok(Json(state.catalog().fetch_pool(DeckPool::Trails).await?))
}

async fn main_deck(State(state): State<AppState>) -> AppResult<Json<Vec<Card>>> {
    Ok(Json(state.catalog().fetch_pool(DeckPool::MainDeck).await?))
}

/// Companion candidates filtered by `type`, `rarity` and `sort`.
async fn companions(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<Vec<Card>>> {
    let filters = parse_filters(query.as_deref().unwrap_or_default());
    Ok(Json(state.catalog().fetch_unpaged(&filters).await?))
}
