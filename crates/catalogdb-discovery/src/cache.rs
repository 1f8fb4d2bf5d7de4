use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use catalogdb_core::types::{Category, CategoryId};

/// Category-name embeddings for one exact set of active categories.
#[derive(Debug, Clone)]
pub struct CategoryVectors {
    pub ids: Vec<CategoryId>,
    pub vectors: Vec<Vec<f32>>,
}

struct Entry {
    fingerprint: blake3::Hash,
    vectors: Arc<CategoryVectors>,
    stored_at: Instant,
}

/// Short-lived cache of category embeddings.
///
/// Keyed by a fingerprint of the embedder and every (id, name) pair, so any
/// change to the active category set misses.
pub struct CategoryEmbeddingCache {
    ttl: Duration,
    entry: Mutex<Option<Entry>>,
}

impl CategoryEmbeddingCache {
    pub fn new(ttl: Duration) -> Self { Self { ttl, entry: Mutex::new(None) } }

    pub fn fingerprint(embedder_id: &str, categories: &[Category]) -> blake3::Hash {
        let mut pairs: Vec<(&str, &str)> = categories.iter().map(|c| (c.id.as_str(), c.name.as_str())).collect();
        pairs.sort_unstable();
        let mut hasher = blake3::Hasher::new();
        hasher.update(embedder_id.as_bytes());
        for (id, name) in pairs {
            hasher.update(&[0]);
            hasher.update(id.as_bytes());
            hasher.update(&[0x1f]);
            hasher.update(name.as_bytes());
        }
        hasher.finalize()
    }

    pub fn get(&self, fingerprint: &blake3::Hash) -> Option<Arc<CategoryVectors>> {
        let guard = self.entry.lock().ok()?;
        let entry = guard.as_ref()?;
        (entry.fingerprint == *fingerprint && entry.stored_at.elapsed() < self.ttl).then(|| Arc::clone(&entry.vectors))
    }

    pub fn put(&self, fingerprint: blake3::Hash, vectors: Arc<CategoryVectors>) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = Some(Entry { fingerprint, vectors, stored_at: Instant::now() });
        }
    }
}
