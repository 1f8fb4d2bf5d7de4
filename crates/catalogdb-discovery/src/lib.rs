//! catalogdb-discovery
//!
//! The product discovery engine: hybrid text search, image-to-category
//! classification, visually similar items, the catalog write paths that
//! keep the vector index in step with the store, and orders.

pub mod cache;
pub mod catalog;
pub mod category;
pub mod classifier;
pub mod compose;
pub mod engine;
pub mod orders;
pub mod ratings;

pub use catalog::CatalogService;
pub use classifier::{CategoryClassifier, Classification};
pub use engine::Discovery;
pub use orders::OrderService;
