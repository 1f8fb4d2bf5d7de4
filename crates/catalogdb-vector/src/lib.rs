//! catalogdb-vector
//!
//! Vector indexes for product embeddings: a LanceDB table for persistent
//! catalogs and a flat in-memory index for transient scopes and tests.

pub mod backfill;
pub mod indexer;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod table;

pub use backfill::{backfill_embeddings, BackfillReport};
pub use indexer::ProductIndexer;
pub use lance::LanceVectorIndex;
pub use memory::MemoryVectorIndex;
