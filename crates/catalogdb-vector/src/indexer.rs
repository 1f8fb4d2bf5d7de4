//! Glue between products and their embeddings.
//!
//! Every embedding call runs on the blocking pool under `embed.timeout_ms`;
//! a provider error or an expired timer surfaces as `ProviderUnavailable`.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use catalogdb_core::traits::{Embedder, ImageFetcher, VectorIndex};
use catalogdb_core::types::{EmbeddingRecord, ImageInput, Product, ProductId, SearchHit};
use catalogdb_core::{Error, Result};
use catalogdb_embed::decode_image;

#[derive(Clone)]
pub struct ProductIndexer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    fetcher: Arc<dyn ImageFetcher>,
    embed_timeout: Duration,
}

impl ProductIndexer {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        fetcher: Arc<dyn ImageFetcher>,
        embed_timeout: Duration,
    ) -> Self {
        Self { index, embedder, fetcher, embed_timeout }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> { &self.index }
    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    pub async fn fetch_image(&self, url: &str) -> Result<ImageInput> {
        let image_fetch = |reason: String| Error::ImageFetch { url: url.to_string(), reason };
        let bytes = self.fetcher.fetch(url).await.map_err(|e| image_fetch(format!("{e:#}")))?;
        decode_image(&bytes).map_err(|e| image_fetch(format!("{e:#}")))
    }

    pub async fn embed_image(&self, image: ImageInput) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        self.run_embedding(move || embedder.embed_image(&image)).await
    }

    pub async fn embed_texts(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let expected = texts.len();
        let embedder = Arc::clone(&self.embedder);
        let vectors = self.run_embedding(move || embedder.embed_texts(&texts)).await?;
        if vectors.len() != expected {
            return Err(Error::ProviderUnavailable(format!("expected {expected} vectors, got {}", vectors.len())));
        }
        Ok(vectors)
    }

    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| Error::ProviderUnavailable("empty embedding batch".into()))
    }

    /// Embedding of the product's representative image (`images[0]`).
    pub async fn embed_product(&self, product: &Product) -> Result<Vec<f32>> {
        let url = product
            .representative_image()
            .ok_or_else(|| Error::InvalidInput(format!("product {} has no images", product.id)))?;
        let image = self.fetch_image(url).await?;
        self.embed_image(image).await
    }

    pub async fn index_product(&self, product: &Product) -> Result<()> {
        let vector = self.embed_product(product).await?;
        let record = EmbeddingRecord { product_id: product.id.clone(), vector, metadata: product.embedding_metadata() };
        self.index.upsert(record).await.map_err(Error::provider)?;
        debug!(product_id = %product.id, "product indexed");
        Ok(())
    }

    pub async fn remove_products(&self, ids: &[ProductId]) -> Result<()> {
        self.index.delete(ids).await.map_err(Error::provider)
    }

    pub async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.index.query_by_vector(vector, k).await.map_err(Error::provider)
    }

    async fn run_embedding<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(job);
        match tokio::time::timeout(self.embed_timeout, handle).await {
            Err(_) => Err(Error::ProviderUnavailable(format!("embedding timed out after {:?}", self.embed_timeout))),
            Ok(Err(join)) => Err(Error::provider(join)),
            Ok(Ok(result)) => result.map_err(|e| Error::provider(format!("{e:#}"))),
        }
    }
}
