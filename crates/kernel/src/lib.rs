//! Codex Kernel Library
//!
//! Card catalog server: filter model, SQL generation, catalog queries and
//! the HTTP API. The `codex` binary runs the server; the client crate reuses
//! the filter model and its query-string codec.

pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod state;

pub use app::build_app;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Card, CardDetail};
pub use state::AppState;
