//! Card catalog: filter model, query builder and query service.
//!
//! - `FilterModel`: the active facet selection
//! - `params`: query-string codec shared by the server and the client
//! - `CatalogQueryBuilder`: SeaQuery-based SQL generation
//! - `CatalogService`: executes catalog queries against PostgreSQL

pub mod filter;
pub mod params;
mod query_builder;
mod service;
pub mod vocabulary;

pub use filter::{
    COMBAT_DEFAULT, COST_DEFAULT, DEFAULT_LIMIT, Direction, FilterModel, RarityTag, SearchMode,
    SortField, SortKey, StatMode, StatRange, TypeTag,
};
pub use params::{
    PageWindow, ParamError, parse_filters, parse_listing, parse_window, to_query_string,
};
pub use query_builder::{
    BuiltQuery, CabinTable, CardTable, CatalogQueryBuilder, DeckPool, QueryBuildError, SqlParam,
    build_card_by_id, build_pool, rarity_column, type_column,
};
pub use service::CatalogService;
