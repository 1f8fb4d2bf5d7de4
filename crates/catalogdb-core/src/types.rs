//! Typed catalog records shared by the store, the indexes and the engine.
//!
//! Every identifier is a plain string. Generated ids are UUID v4; references
//! between records (`category_id`, `merchant_id`, `product_id`, ...) hold the
//! same plain strings, never a wrapped document reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type ProductId = String;
pub type CategoryId = String;
pub type MerchantId = String;
pub type ReviewId = String;
pub type UserId = String;
pub type OrderId = String;

pub fn new_id() -> String { uuid::Uuid::new_v4().to_string() }

fn default_true() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: CategoryId,
    pub merchant_id: MerchantId,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The image used for every embedding of this product: `images[0]`.
    pub fn representative_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }

    /// Case-insensitive substring match over name and description.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.description.to_lowercase().contains(&needle)
    }

    pub fn embedding_metadata(&self) -> EmbeddingMetadata {
        EmbeddingMetadata { category_id: self.category_id.clone(), price: self.price }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Scalar metadata stored next to a product vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    pub category_id: CategoryId,
    pub price: f64,
}

/// One embedding per product, owned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub product_id: ProductId,
    pub vector: Vec<f32>,
    pub metadata: EmbeddingMetadata,
}

/// A nearest-neighbour hit; `score` is cosine similarity, higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ProductId,
    pub score: f32,
}

/// Raw RGB8 pixels, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageInput {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> crate::Result<Self> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(crate::Error::InvalidInput(format!(
                "image buffer of {} bytes does not match {}x{} RGB",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn pixels(&self) -> &[u8] { &self.pixels }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: usize,
}

impl RatingSummary {
    /// Mean rounded to two decimals; `None` when there are no ratings.
    pub fn from_ratings(ratings: &[u8]) -> Self {
        if ratings.is_empty() {
            return Self::default();
        }
        let sum: f64 = ratings.iter().map(|&r| f64::from(r)).sum();
        let mean = sum / ratings.len() as f64;
        Self { average_rating: Some((mean * 100.0).round() / 100.0), review_count: ratings.len() }
    }
}

/// A product as returned to callers, with derived rating fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: Product,
    pub average_rating: Option<f64>,
    pub review_count: usize,
}

impl ProductSummary {
    pub fn new(product: Product, rating: RatingSummary) -> Self {
        Self { product, average_rating: rating.average_rating, review_count: rating.review_count }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub related_products: Vec<ProductSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSearchResult {
    pub category_id: CategoryId,
    pub similarity: f32,
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<CategoryNode>,
}

/// Structural and text predicates applied by the store.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_ids: Option<HashSet<CategoryId>>,
    pub merchant_id: Option<MerchantId>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub active_only: bool,
    pub text: Option<String>,
}

impl ProductFilter {
    pub fn active() -> Self { Self { active_only: true, ..Self::default() } }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.active_only && !product.is_active { return false; }
        if let Some(ids) = &self.category_ids {
            if !ids.contains(&product.category_id) { return false; }
        }
        if let Some(merchant) = &self.merchant_id {
            if &product.merchant_id != merchant { return false; }
        }
        if self.min_price.is_some_and(|min| product.price < min) { return false; }
        if self.max_price.is_some_and(|max| product.price > max) { return false; }
        match &self.text {
            Some(text) => product.matches_text(text),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> { items.into_iter().skip(self.skip).take(self.limit).collect() }
}

/// A product listing request; `search` triggers the semantic + keyword merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub merchant_id: Option<MerchantId>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: CategoryId,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<CategoryId>,
    pub stock_quantity: Option<i64>,
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` (JSON `null`) moves the category to the root.
    #[serde(default, deserialize_with = "present_or_null")]
    pub parent_id: Option<Option<CategoryId>>,
    pub is_active: Option<bool>,
}

/// Keeps "field absent" (`None`) apart from "field set to null" (`Some(None)`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub user_id: UserId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

/// One order line; `price` is the unit price captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: f64,
}

/// An order holds products from exactly one merchant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub merchant_id: MerchantId,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub contact_phone: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<OrderLine>,
    pub shipping_address: String,
    pub contact_phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub shipping_address: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub merchant_id: Option<MerchantId>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.user_id.as_ref().map_or(true, |u| &order.user_id == u)
            && self.merchant_id.as_ref().map_or(true, |m| &order.merchant_id == m)
            && self.status.map_or(true, |s| order.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, category: &str, price: f64) -> Product {
        Product {
            id: id.into(),
            name: format!("Trail Shoe {id}"),
            description: "Lightweight running shoe".into(),
            price,
            category_id: category.into(),
            merchant_id: "m1".into(),
            images: vec![],
            stock_quantity: 3,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rating_summary_rounds_and_handles_empty() {
        assert_eq!(RatingSummary::from_ratings(&[5, 3]), RatingSummary { average_rating: Some(4.0), review_count: 2 });
        assert_eq!(RatingSummary::from_ratings(&[5, 4, 4]).average_rating, Some(4.33));
        assert_eq!(RatingSummary::from_ratings(&[]), RatingSummary { average_rating: None, review_count: 0 });
    }

    #[test]
    fn category_update_tells_absent_parent_from_null() {
        let keep: CategoryUpdate = serde_json::from_str(r#"{"name":"Mugs"}"#).unwrap();
        assert_eq!(keep.parent_id, None);
        let clear: CategoryUpdate = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(clear.parent_id, Some(None));
        let set: CategoryUpdate = serde_json::from_str(r#"{"parent_id":"home"}"#).unwrap();
        assert_eq!(set.parent_id, Some(Some("home".to_string())));
    }

    #[test]
    fn filter_is_case_insensitive_and_structural() {
        let p = product("p1", "shoes", 40.0);
        assert!(ProductFilter::active().with_text("RUNNING").matches(&p));
        assert!(!ProductFilter::active().with_text("sandal").matches(&p));

        let mut f = ProductFilter::active();
        f.min_price = Some(50.0);
        assert!(!f.matches(&p));
        f.min_price = None;
        f.category_ids = Some(["bags".to_string()].into_iter().collect());
        assert!(!f.matches(&p));

        let mut inactive = p.clone();
        inactive.is_active = false;
        assert!(!ProductFilter::active().matches(&inactive));
        assert!(ProductFilter::default().matches(&inactive));
    }

    #[test]
    fn pagination_windows() {
        let items: Vec<u32> = (1..=5).collect();
        assert_eq!(Pagination { skip: 0, limit: 2 }.apply(items.clone()), vec![1, 2]);
        assert_eq!(Pagination { skip: 4, limit: 2 }.apply(items), vec![5]);
    }

    #[test]
    fn image_input_rejects_wrong_buffer_size() {
        assert!(ImageInput::new(2, 2, vec![0; 12]).is_ok());
        assert!(ImageInput::new(2, 2, vec![0; 11]).is_err());
        assert!(ImageInput::new(0, 2, vec![]).is_err());
    }
}
