#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use catalogdb_core::config::{ClassifierSettings, SearchSettings};
use catalogdb_core::seed::SeedBundle;
use catalogdb_core::traits::{Embedder, ImageFetcher, VectorIndex};
use catalogdb_core::types::{Category, EmbeddingRecord, ImageInput, Product, ProductId, ProductSummary, Review, SearchHit};
use catalogdb_discovery::{CatalogService, Discovery, OrderService};
use catalogdb_store::JsonCatalog;
use catalogdb_vector::{MemoryVectorIndex, ProductIndexer};

pub const DIM: usize = 3;

/// Three-channel embedder: images map to their mean RGB, text maps colour
/// words onto the matching channel.
pub struct ColorEmbedder {
    pub down: bool,
}

impl ColorEmbedder {
    pub fn up() -> Arc<Self> { Arc::new(Self { down: false }) }
    pub fn down() -> Arc<Self> { Arc::new(Self { down: true }) }
}

impl Embedder for ColorEmbedder {
    fn embedder_id(&self) -> &str { "color:d3" }
    fn dim(&self) -> usize { DIM }

    fn embed_texts(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.down { anyhow::bail!("embedding service unreachable"); }
        Ok(texts
            .iter()
            .map(|t| {
                let t = t.to_lowercase();
                let on = |word: &str| if t.contains(word) { 1.0 } else { 0.0 };
                vec![on("red"), on("green"), on("blue")]
            })
            .collect())
    }

    fn embed_image(&self, image: &ImageInput) -> anyhow::Result<Vec<f32>> {
        if self.down { anyhow::bail!("embedding service unreachable"); }
        let mut sum = [0f32; 3];
        for px in image.pixels().chunks_exact(3) {
            for (acc, &c) in sum.iter_mut().zip(px) {
                *acc += f32::from(c);
            }
        }
        Ok(sum.to_vec())
    }
}

pub fn color_of(url: &str) -> Option<[u8; 3]> {
    let name = url.trim_end_matches(".png");
    Some(match name {
        "red" => [220, 20, 20],
        "crimson" => [200, 10, 40],
        "green" => [20, 200, 20],
        "blue" => [10, 10, 220],
        "navy" => [0, 0, 128],
        "teal" => [0, 128, 128],
        _ => return None,
    })
}

pub fn png(rgb: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serves a solid PNG for known colour names (`red.png`), 404 for anything else.
pub struct ColorFetcher;

#[async_trait]
impl ImageFetcher for ColorFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        match color_of(url) {
            Some(rgb) => Ok(png(rgb)),
            None => anyhow::bail!("404 for {url}"),
        }
    }
}

/// An index whose backend is always down.
pub struct DownIndex;

#[async_trait]
impl VectorIndex for DownIndex {
    async fn upsert(&self, _record: EmbeddingRecord) -> anyhow::Result<()> { anyhow::bail!("index down") }
    async fn delete(&self, _ids: &[ProductId]) -> anyhow::Result<()> { anyhow::bail!("index down") }
    async fn query_by_vector(&self, _vector: &[f32], _k: usize) -> anyhow::Result<Vec<SearchHit>> {
        anyhow::bail!("index down")
    }
    async fn count(&self) -> anyhow::Result<usize> { anyhow::bail!("index down") }
}

pub struct Harness {
    pub store: Arc<JsonCatalog>,
    pub indexer: ProductIndexer,
    pub discovery: Discovery,
    pub catalog: CatalogService,
    pub orders: OrderService,
}

pub fn harness_with(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, cache_ttl_secs: u64) -> Harness {
    let store = Arc::new(JsonCatalog::in_memory());
    let indexer = ProductIndexer::new(index, embedder, Arc::new(ColorFetcher), Duration::from_secs(5));
    let discovery = Discovery::new(
        store.clone(),
        indexer.clone(),
        SearchSettings::default(),
        &ClassifierSettings { cache_ttl_secs },
    );
    let catalog = CatalogService::new(store.clone(), indexer.clone());
    let orders = OrderService::new(store.clone(), SearchSettings::default());
    Harness { store, indexer, discovery, catalog, orders }
}

pub fn harness() -> (Harness, Arc<MemoryVectorIndex>) {
    let index = Arc::new(MemoryVectorIndex::new(DIM));
    (harness_with(ColorEmbedder::up(), index.clone(), 0), index)
}

pub fn category(id: &str, name: &str, parent: Option<&str>) -> Category {
    Category {
        id: id.into(),
        name: name.into(),
        description: None,
        parent_id: parent.map(Into::into),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn product(id: &str, name: &str, category_id: &str, image: Option<&str>) -> Product {
    Product {
        id: id.into(),
        name: name.into(),
        description: "catalog item".into(),
        price: 10.0,
        category_id: category_id.into(),
        merchant_id: "m1".into(),
        images: image.map(|i| vec![i.to_string()]).unwrap_or_default(),
        stock_quantity: 1,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn review(id: &str, product_id: &str, user_id: &str, rating: u8) -> Review {
    Review {
        id: id.into(),
        product_id: product_id.into(),
        user_id: user_id.into(),
        rating,
        comment: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn seed(categories: Vec<Category>, products: Vec<Product>, reviews: Vec<Review>) -> SeedBundle {
    SeedBundle { categories, products, reviews, orders: Vec::new() }
}

pub fn summary_ids(items: &[ProductSummary]) -> Vec<&str> {
    items.iter().map(|s| s.product.id.as_str()).collect()
}
