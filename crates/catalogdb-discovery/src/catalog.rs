//! Write paths for categories, products and reviews.
//!
//! Product writes are two steps: the store first, then the vector index. A
//! failed index step leaves the product stored but not yet searchable by
//! similarity; it is logged and picked up by the next backfill.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{
    new_id, Category, CategoryNode, CategoryUpdate, MerchantId, NewCategory, NewProduct, NewReview, Product,
    ProductFilter, ProductUpdate, Review, ReviewUpdate,
};
use catalogdb_core::{Error, Result};
use catalogdb_store::validate::{validate_category, validate_product, validate_rating};
use catalogdb_vector::ProductIndexer;

use crate::category::{build_category_tree, would_create_cycle};

pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    indexer: ProductIndexer,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, indexer: ProductIndexer) -> Self { Self { store, indexer } }

    // ---- categories ----

    pub fn create_category(&self, input: NewCategory) -> Result<Category> {
        if let Some(parent) = &input.parent_id {
            self.require_category(parent)?;
        }
        let now = Utc::now();
        let category = Category {
            id: new_id(),
            name: input.name,
            description: input.description,
            parent_id: input.parent_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        validate_category(&category)?;
        self.store.insert_category(category.clone()).map_err(Error::from_store)?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub fn get_category(&self, id: &str) -> Result<Category> { self.require_category(id) }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.store.list_categories(false).map_err(Error::from_store)
    }

    pub fn update_category(&self, id: &str, update: CategoryUpdate) -> Result<Category> {
        let mut category = self.require_category(id)?;
        match update.parent_id {
            Some(Some(parent)) => {
                self.require_category(&parent)?;
                if would_create_cycle(self.store.as_ref(), id, &parent)? {
                    return Err(Error::InvalidInput(format!("category {parent} is {id} or one of its descendants")));
                }
                category.parent_id = Some(parent);
            }
            Some(None) => category.parent_id = None,
            None => {}
        }
        if let Some(name) = update.name { category.name = name; }
        if let Some(description) = update.description { category.description = Some(description); }
        if let Some(active) = update.is_active { category.is_active = active; }
        category.updated_at = Utc::now();
        validate_category(&category)?;
        self.store.replace_category(category.clone()).map_err(Error::from_store)?;
        Ok(category)
    }

    pub fn toggle_category_status(&self, id: &str) -> Result<Category> {
        let mut category = self.require_category(id)?;
        category.is_active = !category.is_active;
        category.updated_at = Utc::now();
        self.store.replace_category(category.clone()).map_err(Error::from_store)?;
        Ok(category)
    }

    /// Hard delete. Children keep their now dangling parent pointer and drop
    /// out of the category tree.
    pub fn delete_category(&self, id: &str) -> Result<()> {
        if !self.store.delete_category(id).map_err(Error::from_store)? {
            return Err(Error::CategoryNotFound(id.to_string()));
        }
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub fn category_tree(&self) -> Result<Vec<CategoryNode>> {
        Ok(build_category_tree(self.store.list_categories(true).map_err(Error::from_store)?))
    }

    // ---- products ----

    pub async fn create_product(&self, merchant_id: &MerchantId, input: NewProduct) -> Result<Product> {
        self.require_category(&input.category_id)?;
        let now = Utc::now();
        let product = Product {
            id: new_id(),
            name: input.name,
            description: input.description,
            price: input.price,
            category_id: input.category_id,
            merchant_id: merchant_id.clone(),
            images: input.images,
            stock_quantity: input.stock_quantity,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        validate_product(&product)?;
        self.store.insert_product(product.clone()).map_err(Error::from_store)?;
        info!(product_id = %product.id, "product created");
        self.sync_embedding(&product).await;
        Ok(product)
    }

    /// Apply a partial update. The embedding is refreshed when the image,
    /// category or price changed, and removed when the product is deactivated.
    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> Result<Product> {
        let before = self.require_product(id)?;
        if let Some(category_id) = &update.category_id {
            self.require_category(category_id)?;
        }
        let mut product = before.clone();
        if let Some(name) = update.name { product.name = name; }
        if let Some(description) = update.description { product.description = description; }
        if let Some(price) = update.price { product.price = price; }
        if let Some(category_id) = update.category_id { product.category_id = category_id; }
        if let Some(stock) = update.stock_quantity { product.stock_quantity = stock; }
        if let Some(images) = update.images { product.images = images; }
        if let Some(active) = update.is_active { product.is_active = active; }
        product.updated_at = Utc::now();
        validate_product(&product)?;
        self.store.replace_product(product.clone()).map_err(Error::from_store)?;

        let embedding_stale = product.is_active != before.is_active
            || product.representative_image() != before.representative_image()
            || product.embedding_metadata() != before.embedding_metadata();
        if embedding_stale {
            self.sync_embedding(&product).await;
        }
        Ok(product)
    }

    /// Soft delete: the product stays in the store, inactive, and leaves the index.
    pub async fn delete_product(&self, id: &str) -> Result<()> {
        let mut product = self.require_product(id)?;
        product.is_active = false;
        product.updated_at = Utc::now();
        self.store.replace_product(product.clone()).map_err(Error::from_store)?;
        self.sync_embedding(&product).await;
        Ok(())
    }

    /// Every product of a merchant, inactive ones included.
    pub fn merchant_inventory(&self, merchant_id: &MerchantId) -> Result<Vec<Product>> {
        let filter = ProductFilter { merchant_id: Some(merchant_id.clone()), ..ProductFilter::default() };
        self.store.find_products(&filter).map_err(Error::from_store)
    }

    // ---- reviews ----

    pub fn add_review(&self, product_id: &str, input: NewReview) -> Result<Review> {
        self.require_product(product_id)?;
        validate_rating(input.rating)?;
        let existing = self.store.reviews_for(product_id).map_err(Error::from_store)?;
        if existing.iter().any(|r| r.user_id == input.user_id) {
            return Err(Error::DuplicateReview { product_id: product_id.to_string(), user_id: input.user_id });
        }
        let now = Utc::now();
        let review = Review {
            id: new_id(),
            product_id: product_id.to_string(),
            user_id: input.user_id,
            rating: input.rating,
            comment: input.comment,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_review(review.clone()).map_err(Error::from_store)?;
        Ok(review)
    }

    pub fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>> {
        self.store.reviews_for(product_id).map_err(Error::from_store)
    }

    pub fn update_review(&self, product_id: &str, review_id: &str, update: ReviewUpdate) -> Result<Review> {
        let mut review = self.require_review(product_id, review_id)?;
        if let Some(rating) = update.rating {
            validate_rating(rating)?;
            review.rating = rating;
        }
        if let Some(comment) = update.comment { review.comment = Some(comment); }
        review.updated_at = Utc::now();
        self.store.replace_review(review.clone()).map_err(Error::from_store)?;
        Ok(review)
    }

    pub fn delete_review(&self, product_id: &str, review_id: &str) -> Result<()> {
        let review = self.require_review(product_id, review_id)?;
        if !self.store.delete_review(&review.id).map_err(Error::from_store)? {
            return Err(Error::ReviewNotFound(review_id.to_string()));
        }
        Ok(())
    }

    fn require_category(&self, id: &str) -> Result<Category> {
        self.store.get_category(id).map_err(Error::from_store)?.ok_or_else(|| Error::CategoryNotFound(id.to_string()))
    }

    fn require_product(&self, id: &str) -> Result<Product> {
        self.store.get_product(id).map_err(Error::from_store)?.ok_or_else(|| Error::ProductNotFound(id.to_string()))
    }

    /// Reviews are addressed through their product.
    fn require_review(&self, product_id: &str, review_id: &str) -> Result<Review> {
        self.store
            .get_review(review_id)
            .map_err(Error::from_store)?
            .filter(|r| r.product_id == product_id)
            .ok_or_else(|| Error::ReviewNotFound(review_id.to_string()))
    }

    /// Second step of a product write. Never fails the caller.
    async fn sync_embedding(&self, product: &Product) {
        let result = if product.is_active && product.representative_image().is_some() {
            self.indexer.index_product(product).await
        } else {
            self.indexer.remove_products(std::slice::from_ref(&product.id)).await
        };
        if let Err(e) = result {
            warn!(product_id = %product.id, error = %e, "vector index not updated; product left for backfill");
        }
    }
}
