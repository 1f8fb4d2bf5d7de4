use anyhow::{anyhow, bail, Result};
use arrow_array::{Array, FixedSizeListArray, Float32Array, Float64Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use catalogdb_core::traits::VectorIndex;
use catalogdb_core::types::{EmbeddingRecord, ProductId, SearchHit};

use crate::schema::build_products_schema;
use crate::table::{ensure_table, id_in_predicate, open_db};

/// Persistent product vectors in a single Lance table, cosine distance.
pub struct LanceVectorIndex {
    db: Connection,
    table_name: String,
    dim: i32,
}

impl LanceVectorIndex {
    pub async fn open(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
        let dim = i32::try_from(dim).map_err(|_| anyhow!("embedding dim {} out of range", dim))?;
        let db = open_db(uri).await?;
        ensure_table(&db, table_name, build_products_schema(dim)).await?;
        Ok(Self { db, table_name: table_name.to_string(), dim })
    }

    fn record_batch(&self, record: &EmbeddingRecord) -> Result<RecordBatch> {
        if record.vector.len() != self.dim as usize {
            bail!("dim mismatch: got {} expected {}", record.vector.len(), self.dim);
        }
        let vectors = vec![Some(record.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>())];
        let batch = RecordBatch::try_new(
            build_products_schema(self.dim),
            vec![
                Arc::new(StringArray::from(vec![record.product_id.clone()])),
                Arc::new(StringArray::from(vec![record.metadata.category_id.clone()])),
                Arc::new(Float64Array::from(vec![record.metadata.price])),
                Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), self.dim)),
            ],
        )?;
        Ok(batch)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn upsert(&self, record: EmbeddingRecord) -> Result<()> {
        let batch = self.record_batch(&record)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.db.open_table(&self.table_name).execute().await?;
        // Upsert behavior via merge_insert: id is unique
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        debug!(id = %record.product_id, "embedding upserted");
        Ok(())
    }

    async fn delete(&self, ids: &[ProductId]) -> Result<()> {
        if ids.is_empty() { return Ok(()); }
        let table = self.db.open_table(&self.table_name).execute().await?;
        table.delete(&id_in_predicate(ids)).await?;
        Ok(())
    }

    async fn query_by_vector(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 { return Ok(Vec::new()); }
        let table = self.db.open_table(&self.table_name).execute().await?;
        if table.count_rows(None).await? == 0 { return Ok(Vec::new()); }
        let mut stream = table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        let mut seen = HashSet::new();
        while let Some(batch) = stream.try_next().await? {
            let ids = batch
                .column_by_name("id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow!("missing id column"))?;
            let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
            for i in 0..batch.num_rows() {
                if !ids.is_valid(i) { continue; }
                let id = ids.value(i).to_string();
                if !seen.insert(id.clone()) { continue; }
                let score = distances.map_or(0.0, |d| 1.0 - d.value(i));
                hits.push(SearchHit { id, score });
            }
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let table = self.db.open_table(&self.table_name).execute().await?;
        Ok(table.count_rows(None).await?)
    }
}
