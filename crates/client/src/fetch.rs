//! Incremental fetch controller.
//!
//! Pages through the listing endpoint as the user scrolls. A *reset* fetch
//! replaces the visible list; a *load-more* fetch appends to it after
//! dropping ids that are already visible. Every reset bumps a generation
//! counter and responses tagged with an older generation are discarded, so
//! the most recent reset always wins over anything still in flight.
//!
//! The controller performs no I/O. It hands out [`FetchTicket`]s describing
//! the request to make and is told about the outcome through
//! [`IncrementalFetchController::apply`].

use std::collections::HashSet;

use codex_kernel::catalog::FilterModel;
use codex_kernel::models::Card;

use crate::fetcher::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Reset,
    LoadMore,
}

/// A request the controller wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    kind: FetchKind,
    filters: FilterModel,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> FetchKind {
        self.kind
    }

    /// Filters positioned at the page window to request.
    pub fn filters(&self) -> &FilterModel {
        &self.filters
    }

    pub fn offset(&self) -> i64 {
        self.filters.offset
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FetchKind,
    pub message: String,
}

/// What the list view should show.
///
/// `Empty` means the filters matched nothing; `Failed` means results are not
/// available right now and can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Idle,
    Loading,
    Ready,
    Empty,
    Failed(FetchFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The response belonged to a superseded generation and was dropped.
    Stale,
}

#[derive(Debug)]
pub struct IncrementalFetchController {
    filters: FilterModel,
    limit: i64,
    next_offset: i64,
    cards: Vec<Card>,
    seen: HashSet<String>,
    has_more: bool,
    status: ListStatus,
    generation: u64,
    in_flight: Option<FetchKind>,
    retry_ticket: Option<FetchTicket>,
}

impl IncrementalFetchController {
    pub fn new(limit: i64) -> Self {
        let limit = limit.max(1);
        Self {
            filters: FilterModel::default().with_window(0, limit),
            limit,
            next_offset: 0,
            cards: Vec::new(),
            seen: HashSet::new(),
            has_more: false,
            status: ListStatus::Idle,
            generation: 0,
            in_flight: None,
            retry_ticket: None,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card_ids(&self) -> Vec<String> {
        self.cards.iter().map(|c| c.id.clone()).collect()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<FetchKind> {
        self.in_flight
    }

    /// The filter selection currently being paged.
    pub fn filters(&self) -> &FilterModel {
        &self.filters
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// `fetchPage(reset)`: a reset for the current filters, or a load-more.
    pub fn fetch_page(&mut self, reset: bool) -> Option<FetchTicket> {
        if reset {
            let filters = self.filters.clone();
            Some(self.reset(filters))
        } else {
            self.load_more()
        }
    }

    /// Start over with new filters. Anything in flight becomes stale.
    pub fn reset(&mut self, filters: FilterModel) -> FetchTicket {
        self.generation += 1;
        self.filters = filters.with_window(0, self.limit);
        self.in_flight = Some(FetchKind::Reset);
        self.retry_ticket = None;
        self.status = ListStatus::Loading;

        tracing::debug!(generation = self.generation, "reset fetch issued");
        self.ticket(FetchKind::Reset, 0)
    }

    /// Request the next page, unless a fetch is already outstanding or the
    /// previous page came back short.
    pub fn load_more(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }

        self.in_flight = Some(FetchKind::LoadMore);
        self.retry_ticket = None;
        self.status = ListStatus::Loading;
        tracing::debug!(
            generation = self.generation,
            offset = self.next_offset,
            "load-more fetch issued"
        );
        Some(self.ticket(FetchKind::LoadMore, self.next_offset))
    }

    /// The sentinel at the bottom of the list scrolled into view.
    pub fn on_sentinel_visible(&mut self) -> Option<FetchTicket> {
        self.load_more()
    }

    /// Re-issue the request that failed last.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        let failed = self.retry_ticket.take()?;
        match failed.kind {
            FetchKind::Reset => {
                let filters = self.filters.clone();
                Some(self.reset(filters))
            }
            FetchKind::LoadMore => {
                self.in_flight = Some(FetchKind::LoadMore);
                self.status = ListStatus::Loading;
                Some(self.ticket(FetchKind::LoadMore, failed.offset()))
            }
        }
    }

    /// Fold a response into the visible list.
    pub fn apply(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Card>, FetchError>,
    ) -> ApplyOutcome {
        if ticket.generation != self.generation || self.in_flight != Some(ticket.kind) {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                kind = ?ticket.kind,
                "discarding stale fetch response"
            );
            return ApplyOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(rows) => {
                self.retry_ticket = None;
                let received = rows.len();
                match ticket.kind {
                    FetchKind::Reset => {
                        self.cards.clear();
                        self.seen.clear();
                        self.append_unseen(rows);
                        self.next_offset = self.limit;
                    }
                    FetchKind::LoadMore => {
                        let appended = self.append_unseen(rows);
                        if appended < received {
                            tracing::debug!(
                                duplicates = received - appended,
                                "dropped rows already visible"
                            );
                        }
                        self.next_offset = ticket.offset() + self.limit;
                    }
                }
                self.has_more = i64::try_from(received).unwrap_or(i64::MAX) >= self.limit;
                self.status = if self.cards.is_empty() {
                    ListStatus::Empty
                } else {
                    ListStatus::Ready
                };
            }
            Err(err) => {
                tracing::warn!(kind = ?ticket.kind, error = %err, "card fetch failed");
                if ticket.kind == FetchKind::Reset {
                    self.cards.clear();
                    self.seen.clear();
                    self.has_more = false;
                }
                self.status = ListStatus::Failed(FetchFailure {
                    kind: ticket.kind,
                    message: err.to_string(),
                });
                self.retry_ticket = Some(ticket.clone());
            }
        }

        ApplyOutcome::Applied
    }

    fn append_unseen(&mut self, rows: Vec<Card>) -> usize {
        let before = self.cards.len();
        for card in rows {
            if self.seen.insert(card.id.clone()) {
                self.cards.push(card);
            }
        }
        self.cards.len() - before
    }

    fn ticket(&self, kind: FetchKind, offset: i64) -> FetchTicket {
        FetchTicket {
            generation: self.generation,
            kind,
            filters: self.filters.with_window(offset, self.limit),
        }
    }
}
