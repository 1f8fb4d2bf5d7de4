use async_trait::async_trait;

use crate::types::{
    Category, CategoryId, EmbeddingRecord, ImageInput, Order, OrderFilter, Product, ProductFilter, ProductId, RatingSummary,
    Review, ReviewId, SearchHit,
};

/// Maps images and text into one shared vector space.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hashed:d512`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
    fn embed_image(&self, image: &ImageInput) -> anyhow::Result<Vec<f32>>;
}

/// Nearest-neighbour storage for product embeddings.
///
/// `query_by_vector` returns at most `k` distinct ids, nearest first.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, record: EmbeddingRecord) -> anyhow::Result<()>;
    /// Unknown ids are ignored.
    async fn delete(&self, ids: &[ProductId]) -> anyhow::Result<()>;
    async fn query_by_vector(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
    async fn count(&self) -> anyhow::Result<usize>;
}

/// Document store for the catalog collections.
///
/// Listing methods return records in the store's natural (insertion) order.
pub trait CatalogStore: Send + Sync {
    fn get_product(&self, id: &str) -> anyhow::Result<Option<Product>>;
    fn insert_product(&self, product: Product) -> anyhow::Result<()>;
    fn replace_product(&self, product: Product) -> anyhow::Result<()>;
    fn find_products(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>>;

    fn get_category(&self, id: &str) -> anyhow::Result<Option<Category>>;
    fn insert_category(&self, category: Category) -> anyhow::Result<()>;
    fn replace_category(&self, category: Category) -> anyhow::Result<()>;
    fn delete_category(&self, id: &str) -> anyhow::Result<bool>;
    fn list_categories(&self, active_only: bool) -> anyhow::Result<Vec<Category>>;
    fn child_categories(&self, parent_id: &CategoryId) -> anyhow::Result<Vec<Category>>;

    fn get_review(&self, id: &str) -> anyhow::Result<Option<Review>>;
    fn insert_review(&self, review: Review) -> anyhow::Result<()>;
    fn replace_review(&self, review: Review) -> anyhow::Result<()>;
    fn delete_review(&self, id: &ReviewId) -> anyhow::Result<bool>;
    fn reviews_for(&self, product_id: &str) -> anyhow::Result<Vec<Review>>;
    /// Average and count of ratings over `reviews.product_id`.
    fn rating_summary(&self, product_id: &str) -> anyhow::Result<RatingSummary>;

    fn get_order(&self, id: &str) -> anyhow::Result<Option<Order>>;
    /// Newest first.
    fn find_orders(&self, filter: &OrderFilter) -> anyhow::Result<Vec<Order>>;
    fn replace_order(&self, order: Order) -> anyhow::Result<()>;
    /// Insert the order and take every line's quantity out of stock in one
    /// write. Fails with `InsufficientStock` without touching anything.
    fn place_order(&self, order: Order) -> anyhow::Result<()>;
    /// Mark a pending order cancelled and put its quantities back in stock.
    fn cancel_order(&self, id: &str) -> anyhow::Result<Order>;
}

/// Retrieves the bytes behind a product image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}
