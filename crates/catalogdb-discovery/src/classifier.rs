//! Image-to-category classification.
//!
//! The image is compared against the text embedding of every active
//! category's name. Category vectors live only in this scope (optionally in
//! a short-lived cache) and never enter the product index.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{CategoryId, ImageInput};
use catalogdb_core::{Error, Result};
use catalogdb_embed::cosine_similarity;
use catalogdb_vector::ProductIndexer;

use crate::cache::{CategoryEmbeddingCache, CategoryVectors};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category_id: CategoryId,
    pub similarity: f32,
}

pub struct CategoryClassifier {
    indexer: ProductIndexer,
    cache: Option<CategoryEmbeddingCache>,
}

impl CategoryClassifier {
    /// A zero `cache_ttl` re-embeds category names on every call.
    pub fn new(indexer: ProductIndexer, cache_ttl: Duration) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| CategoryEmbeddingCache::new(cache_ttl));
        Self { indexer, cache }
    }

    pub async fn classify(&self, store: &dyn CatalogStore, image: ImageInput) -> Result<Classification> {
        let categories = store.list_categories(true).map_err(Error::from_store)?;
        if categories.is_empty() {
            return Err(Error::NoCategoriesAvailable);
        }
        let image_vector = self.indexer.embed_image(image).await?;

        let fingerprint = CategoryEmbeddingCache::fingerprint(self.indexer.embedder().embedder_id(), &categories);
        let cached = self.cache.as_ref().and_then(|c| c.get(&fingerprint));
        let category_vectors = match cached {
            Some(hit) => hit,
            None => {
                let names = categories.iter().map(|c| c.name.clone()).collect();
                let vectors = self.indexer.embed_texts(names).await?;
                let ids = categories.into_iter().map(|c| c.id).collect();
                let fresh = Arc::new(CategoryVectors { ids, vectors });
                if let Some(cache) = &self.cache {
                    cache.put(fingerprint, Arc::clone(&fresh));
                }
                fresh
            }
        };

        let scored = category_vectors
            .ids
            .iter()
            .zip(&category_vectors.vectors)
            .map(|(id, v)| (id.clone(), cosine_similarity(&image_vector, v)))
            .collect();
        let best = best_category(scored).ok_or(Error::NoCategoriesAvailable)?;
        debug!(category_id = %best.category_id, similarity = best.similarity, "image classified");
        Ok(best)
    }
}

/// Argmax by similarity; ties go to the lexicographically smallest id.
pub fn best_category(mut scored: Vec<(CategoryId, f32)>) -> Option<Classification> {
    scored.sort_by(|a, b| a.0.cmp(&b.0));
    let mut iter = scored.into_iter();
    let (first_id, first_score) = iter.next()?;
    let mut best = Classification { category_id: first_id, similarity: first_score };
    for (id, score) in iter {
        if score > best.similarity {
            best = Classification { category_id: id, similarity: score };
        }
    }
    Some(best)
}
