//! Database models.

pub mod card;

pub use card::{Card, CardDetail};
