//! Card listing and detail API routes.
//!
//! The listing, id-list and count endpoints accept the same filter
//! parameters and share one query builder.

use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    routing::get,
};
use serde::Serialize;

use crate::catalog::{parse_filters, parse_listing};
use crate::error::{AppError, AppResult};
use crate::models::{Card, CardDetail};
use crate::state::AppState;

/// Create the cards router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cards", get(list_cards))
        .route("/api/cards/ids", get(list_card_ids))
        .route("/api/cards/count", get(count_cards))
        .route("/api/cards/{id}", get(get_card))
}

// -------------------------------------------------------------------------
// Response types
// -------------------------------------------------------------------------

#[derive(Serialize)]
struct CountResponse {
    total: i64,
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// One page of cards matching the query-string filters.
async fn list_cards(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<Vec<Card>>> {
    let query = query.unwrap_or_default();
    let filters = parse_listing(&query, state.default_page_limit(), state.max_page_limit())
        .inspect_err(|e| {
            state.metrics().record_rejected();
            tracing::debug!(error = %e, "rejecting listing request");
        })?;

    let cards = state.catalog().fetch_page(&filters).await?;
    Ok(Json(cards))
}

/// Ids of every matching card, in listing order. Pagination is ignored.
async fn list_card_ids(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<Vec<String>>> {
    let filters = parse_filters(query.as_deref().unwrap_or_default());
    let ids = state.catalog().fetch_all_ids(&filters).await?;
    Ok(Json(ids))
}

async fn count_cards(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<CountResponse>> {
    let filters = parse_filters(query.as_deref().unwrap_or_default());
    let total = state.catalog().count(&filters).await?;
    Ok(Json(CountResponse { total }))
}

async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CardDetail>> {
    let card = state
        .catalog()
        .get_card(&id)
        .await?
        .ok_or(AppError::NotFound)?;

    if card.has_rarity_conflict() {
        tracing::warn!(card_id = %card.id, "card has overlapping rarity flags");
    }

    Ok(Json(CardDetail::from(card)))
}
