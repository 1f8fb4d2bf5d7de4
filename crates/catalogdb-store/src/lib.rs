//! catalogdb-store
//!
//! Document store for categories, products and reviews, kept in natural
//! (insertion) order and optionally persisted as a JSON snapshot.

pub mod json;
pub mod validate;

pub use json::{ImportReport, JsonCatalog};
