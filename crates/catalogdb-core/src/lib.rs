//! catalogdb-core
//!
//! Typed catalog records, the error taxonomy, the traits that sit between the
//! discovery engine and its collaborators, and the figment-backed config.

pub mod config;
pub mod error;
pub mod seed;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
