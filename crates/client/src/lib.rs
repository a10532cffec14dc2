//! Codex catalog client.
//!
//! Keeps the filter selection in sync with the page URL, debounces search
//! input and pages through the listing endpoint as the user scrolls.
//!
//! - `FilterStateController`: one-time URL hydration, history mirroring and
//!   change detection
//! - `IncrementalFetchController`: reset vs. load-more paging with stale
//!   response discard
//! - `spawn_session`: an event loop wiring both to a [`CardFetcher`]

pub mod config;
pub mod debounce;
pub mod fetch;
pub mod fetcher;
pub mod filter_state;
pub mod history;
pub mod navigation;
pub mod session;

pub use config::ClientConfig;
pub use fetch::{
    ApplyOutcome, FetchFailure, FetchKind, FetchTicket, IncrementalFetchController, ListStatus,
};
pub use fetcher::{CardFetcher, FetchError, HttpCardFetcher};
pub use filter_state::{ControllerError, FilterEdit, FilterStateController, Phase};
pub use history::{HistoryPort, MemoryHistory};
pub use navigation::{Neighbors, ResultOrder};
pub use session::{SessionClosed, SessionHandle, SessionView, UiEvent, spawn_session};
