//! Flat in-memory index: exact cosine search over every stored vector.
//!
//! Used as a transient scope (nothing is persisted) and as the index behind
//! tests and `--memory` runs of the CLI.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::RwLock;

use catalogdb_core::traits::VectorIndex;
use catalogdb_core::types::{EmbeddingRecord, ProductId, SearchHit};
use catalogdb_embed::cosine_similarity;

pub struct MemoryVectorIndex {
    dim: usize,
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl MemoryVectorIndex {
    pub fn new(dim: usize) -> Self { Self { dim, records: RwLock::new(Vec::new()) } }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().map(|r| r.iter().any(|rec| rec.product_id == id)).unwrap_or(false)
    }

    pub fn get(&self, id: &str) -> Option<EmbeddingRecord> {
        self.records.read().ok()?.iter().find(|rec| rec.product_id == id).cloned()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error { anyhow!("vector index lock poisoned") }

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, record: EmbeddingRecord) -> Result<()> {
        if record.vector.len() != self.dim {
            bail!("dim mismatch: got {} expected {}", record.vector.len(), self.dim);
        }
        let mut records = self.records.write().map_err(poisoned)?;
        match records.iter().position(|r| r.product_id == record.product_id) {
            Some(i) => records[i] = record,
            None => records.push(record),
        }
        Ok(())
    }

    async fn delete(&self, ids: &[ProductId]) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.retain(|r| !ids.contains(&r.product_id));
        Ok(())
    }

    async fn query_by_vector(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut hits: Vec<SearchHit> = records
            .iter()
            .map(|r| SearchHit {
                id: r.product_id.clone(),
                score: cosine_similarity(vector, &r.vector),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> { Ok(self.records.read().map_err(poisoned)?.len()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalogdb_core::types::EmbeddingMetadata;

    fn rec(id: &str, v: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            product_id: id.into(),
            vector: v,
            metadata: EmbeddingMetadata { category_id: "c".into(), price: 1.0 },
        }
    }

    #[tokio::test]
    async fn nearest_first_and_bounded_by_size() {
        let idx = MemoryVectorIndex::new(2);
        idx.upsert(rec("far", vec![0.0, 1.0])).await.unwrap();
        idx.upsert(rec("near", vec![1.0, 0.1])).await.unwrap();
        idx.upsert(rec("mid", vec![1.0, 1.0])).await.unwrap();

        let hits = idx.query_by_vector(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);

        let all = idx.query_by_vector(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(all.len(), 3, "fewer than k when the index is small");
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_ignores_unknown() {
        let idx = MemoryVectorIndex::new(2);
        idx.upsert(rec("p1", vec![1.0, 0.0])).await.unwrap();
        idx.upsert(rec("p1", vec![0.0, 1.0])).await.unwrap();
        assert_eq!(idx.count().await.unwrap(), 1);
        assert_eq!(idx.get("p1").unwrap().vector, vec![0.0, 1.0]);

        idx.delete(&["nope".to_string()]).await.unwrap();
        assert_eq!(idx.count().await.unwrap(), 1);
        idx.delete(&["p1".to_string()]).await.unwrap();
        assert!(!idx.contains("p1"));
    }

    #[tokio::test]
    async fn rejects_wrong_dimension() {
        let idx = MemoryVectorIndex::new(3);
        assert!(idx.upsert(rec("p1", vec![1.0])).await.is_err());
    }
}
