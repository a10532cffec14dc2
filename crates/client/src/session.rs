//! Browsing session.
//!
//! A single task owns the [`FilterStateController`] and the
//! [`IncrementalFetchController`] and processes UI events one at a time.
//! Fetches run as separate tasks and report back through an internal
//! channel, so the event loop never blocks on the network.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use codex_kernel::catalog::FilterModel;
use codex_kernel::models::Card;

use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::fetch::{FetchTicket, IncrementalFetchController, ListStatus};
use crate::fetcher::{CardFetcher, FetchError};
use crate::filter_state::{ControllerError, FilterEdit, FilterStateController};
use crate::history::HistoryPort;

/// Input from the UI.
#[derive(Debug, Clone)]
pub enum UiEvent {
    Edit(FilterEdit),
    /// The search box changed. Folded into the filters after the debounce.
    SearchInput(String),
    /// The bottom-of-list sentinel became visible.
    SentinelVisible,
    Retry,
    Shutdown,
}

enum Internal {
    SearchSettled(u64),
    Fetched(FetchTicket, Result<Vec<Card>, FetchError>),
}

/// Snapshot of what the list view renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub card_ids: Vec<String>,
    pub status: ListStatus,
    pub has_more: bool,
    /// URL query mirrored to history.
    pub query: String,
    pub filters: FilterModel,
    /// Requests handed to the fetcher so far.
    pub fetches_issued: u64,
}

#[derive(Debug, Error)]
#[error("browse session has shut down")]
pub struct SessionClosed;

/// Handle to a running session.
pub struct SessionHandle {
    events: mpsc::Sender<UiEvent>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, event: UiEvent) -> Result<(), SessionClosed> {
        self.events.send(event).await.map_err(|_| SessionClosed)
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Watch receiver for view updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Wait until the view satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionView) -> bool,
    ) -> Result<SessionView, SessionClosed> {
        let mut rx = self.view.clone();
        let view = rx.wait_for(predicate).await.map_err(|_| SessionClosed)?;
        Ok(view.clone())
    }

    /// Stop the session and wait for its task to finish.
    pub async fn shutdown(self) {
        let _ = self.events.send(UiEvent::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "browse session task failed");
        }
    }
}

/// Hydrate from `url_query`, issue the initial fetch and start the event
/// loop on the current runtime.
pub fn spawn_session<H>(
    fetcher: Arc<dyn CardFetcher>,
    history: H,
    config: &ClientConfig,
    url_query: &str,
) -> Result<SessionHandle, ControllerError>
where
    H: HistoryPort + 'static,
{
    let mut filter_state = FilterStateController::new(history, config.page_limit);
    let initial = filter_state.hydrate(url_query)?;

    let (internal_tx, internal_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::channel(64);

    let mut session = BrowseSession {
        filter_state,
        fetch: IncrementalFetchController::new(config.page_limit),
        debouncer: Debouncer::new(config.debounce),
        fetcher,
        internal_tx,
        view: watch::Sender::new(placeholder_view()),
        fetches_issued: 0,
    };

    let ticket = session.fetch.reset(initial);
    session.dispatch(ticket);
    session.filter_state.listen()?;
    session.publish();

    let view = session.view.subscribe();
    let task = tokio::spawn(session.run(events_rx, internal_rx));

    Ok(SessionHandle {
        events: events_tx,
        view,
        task,
    })
}

struct BrowseSession<H> {
    filter_state: FilterStateController<H>,
    fetch: IncrementalFetchController,
    debouncer: Debouncer,
    fetcher: Arc<dyn CardFetcher>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    view: watch::Sender<SessionView>,
    fetches_issued: u64,
}

impl<H: HistoryPort + 'static> BrowseSession<H> {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<UiEvent>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    None | Some(UiEvent::Shutdown) => break,
                    Some(event) => self.handle_event(event),
                },
                Some(message) = internal.recv() => self.handle_internal(message),
            }
            self.publish();
        }

        self.debouncer.cancel();
        tracing::debug!("browse session stopped");
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Edit(edit) => {
                let changed = self.filter_state.edit(edit);
                self.on_filters(changed);
            }
            UiEvent::SearchInput(text) => {
                self.filter_state.set_search_input(&text);
                self.debouncer
                    .schedule(self.internal_tx.clone(), Internal::SearchSettled);
            }
            UiEvent::SentinelVisible => {
                if let Some(ticket) = self.fetch.on_sentinel_visible() {
                    self.dispatch(ticket);
                }
            }
            UiEvent::Retry => {
                if let Some(ticket) = self.fetch.retry() {
                    self.dispatch(ticket);
                }
            }
            UiEvent::Shutdown => {}
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::SearchSettled(seq) => {
                if self.debouncer.settle(seq) {
                    let changed = self.filter_state.commit_search();
                    self.on_filters(changed);
                }
            }
            Internal::Fetched(ticket, result) => {
                self.fetch.apply(&ticket, result);
            }
        }
    }

    fn on_filters(&mut self, changed: Result<Option<FilterModel>, ControllerError>) {
        match changed {
            Ok(Some(filters)) => {
                let ticket = self.fetch.reset(filters);
                self.dispatch(ticket);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "filter edit rejected"),
        }
    }

    fn dispatch(&mut self, ticket: FetchTicket) {
        self.fetches_issued += 1;
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_page(ticket.filters()).await;
            // The receiver is gone when the session shut down.
            let _ = tx.send(Internal::Fetched(ticket, result));
        });
    }

    fn publish(&self) {
        self.view.send_replace(SessionView {
            card_ids: self.fetch.card_ids(),
            status: self.fetch.status().clone(),
            has_more: self.fetch.has_more(),
            query: self.filter_state.query_string().to_string(),
            filters: self.filter_state.filters().clone(),
            fetches_issued: self.fetches_issued,
        });
    }
}

fn placeholder_view() -> SessionView {
    SessionView {
        card_ids: Vec::new(),
        status: ListStatus::Idle,
        has_more: false,
        query: String::new(),
        filters: FilterModel::default(),
        fetches_issued: 0,
    }
}
