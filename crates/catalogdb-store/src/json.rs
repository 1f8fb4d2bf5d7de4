use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use catalogdb_core::seed::SeedBundle;
use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{
    Category, CategoryId, Order, OrderFilter, OrderStatus, Product, ProductFilter, RatingSummary, Review, ReviewId,
};
use catalogdb_core::Error;

use crate::validate::{validate_category, validate_order, validate_product, validate_review};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub categories: usize,
    pub products: usize,
    pub reviews: usize,
    pub orders: usize,
}

/// In-process catalog backed by an optional JSON snapshot.
///
/// The snapshot has the same shape as a seed bundle. Every successful write
/// rewrites it (temp file, then rename) while the write lock is held; a write
/// that fails, including a failed snapshot, leaves the catalog unchanged.
pub struct JsonCatalog {
    data: RwLock<SeedBundle>,
    path: Option<PathBuf>,
}

impl JsonCatalog {
    pub fn in_memory() -> Self { Self { data: RwLock::new(SeedBundle::default()), path: None } }

    /// Load an existing snapshot, or start empty when the file is missing.
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let raw = fs::read_to_string(path).with_context(|| format!("reading catalog {}", path.display()))?;
            let bundle: SeedBundle =
                serde_json::from_str(&raw).with_context(|| format!("parsing catalog {}", path.display()))?;
            info!(
                path = %path.display(),
                categories = bundle.categories.len(),
                products = bundle.products.len(),
                reviews = bundle.reviews.len(),
                "catalog loaded"
            );
            bundle
        } else {
            debug!(path = %path.display(), "no catalog snapshot yet, starting empty");
            SeedBundle::default()
        };
        Ok(Self { data: RwLock::new(data), path: Some(path.to_path_buf()) })
    }

    pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

    /// Bulk-load a bundle. Categories go first, then products, reviews and
    /// orders, so references inside the bundle resolve. Imported orders are
    /// history and leave stock untouched. All or nothing.
    pub fn import(&self, bundle: SeedBundle) -> Result<ImportReport> {
        let report = ImportReport {
            categories: bundle.categories.len(),
            products: bundle.products.len(),
            reviews: bundle.reviews.len(),
            orders: bundle.orders.len(),
        };
        self.write(|data| {
            for category in bundle.categories {
                push_category(data, category)?;
            }
            for category in &data.categories {
                if let Some(parent) = &category.parent_id {
                    if !data.categories.iter().any(|c| &c.id == parent) {
                        bail!("category {} references unknown parent {}", category.id, parent);
                    }
                }
            }
            for product in bundle.products {
                push_product(data, product)?;
            }
            for review in bundle.reviews {
                push_review(data, review)?;
            }
            for order in bundle.orders {
                push_order(data, order)?;
            }
            Ok(())
        })?;
        info!(
            categories = report.categories,
            products = report.products,
            reviews = report.reviews,
            orders = report.orders,
            "bundle imported"
        );
        Ok(report)
    }

    /// Counts of categories, products and reviews.
    pub fn counts(&self) -> Result<ImportReport> {
        let data = self.read()?;
        Ok(ImportReport {
            categories: data.categories.len(),
            products: data.products.len(),
            reviews: data.reviews.len(),
            orders: data.orders.len(),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SeedBundle>> {
        self.data.read().map_err(|_| anyhow!("catalog lock poisoned"))
    }

    /// Changes land on a staged copy; it replaces the live data only once the
    /// snapshot (if any) is on disk.
    fn write<T>(&self, f: impl FnOnce(&mut SeedBundle) -> Result<T>) -> Result<T> {
        let mut guard: RwLockWriteGuard<'_, SeedBundle> = self.data.write().map_err(|_| anyhow!("catalog lock poisoned"))?;
        let mut staged = guard.clone();
        let out = f(&mut staged)?;
        if let Some(path) = &self.path {
            persist(path, &staged)?;
        }
        *guard = staged;
        Ok(out)
    }
}

fn persist(path: &Path, data: &SeedBundle) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let raw = serde_json::to_vec_pretty(data)?;
    fs::write(&tmp, raw).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

fn push_category(data: &mut SeedBundle, category: Category) -> Result<()> {
    validate_category(&category)?;
    if data.categories.iter().any(|c| c.id == category.id) {
        bail!("duplicate category id {}", category.id);
    }
    data.categories.push(category);
    Ok(())
}

fn push_product(data: &mut SeedBundle, product: Product) -> Result<()> {
    validate_product(&product)?;
    if data.products.iter().any(|p| p.id == product.id) {
        bail!("duplicate product id {}", product.id);
    }
    if !data.categories.iter().any(|c| c.id == product.category_id) {
        bail!("product {} references unknown category {}", product.id, product.category_id);
    }
    data.products.push(product);
    Ok(())
}

fn push_review(data: &mut SeedBundle, review: Review) -> Result<()> {
    validate_review(&review)?;
    if data.reviews.iter().any(|r| r.id == review.id) {
        bail!("duplicate review id {}", review.id);
    }
    if !data.products.iter().any(|p| p.id == review.product_id) {
        bail!("review {} references unknown product {}", review.id, review.product_id);
    }
    if data.reviews.iter().any(|r| r.product_id == review.product_id && r.user_id == review.user_id) {
        bail!("user {} already reviewed product {}", review.user_id, review.product_id);
    }
    data.reviews.push(review);
    Ok(())
}

fn push_order(data: &mut SeedBundle, order: Order) -> Result<()> {
    validate_order(&order)?;
    if data.orders.iter().any(|o| o.id == order.id) {
        bail!("duplicate order id {}", order.id);
    }
    for item in &order.items {
        if !data.products.iter().any(|p| p.id == item.product_id) {
            bail!("order {} references unknown product {}", order.id, item.product_id);
        }
    }
    data.orders.push(order);
    Ok(())
}

fn product_mut<'a>(data: &'a mut SeedBundle, id: &str) -> Result<&'a mut Product> {
    data.products
        .iter_mut()
        .find(|p| p.id == id && p.is_active)
        .ok_or_else(|| Error::ProductNotFound(id.to_string()).into())
}

fn replace_in<T>(items: &mut [T], id: &str, item: T, key: impl Fn(&T) -> &str, kind: &str) -> Result<()> {
    match items.iter_mut().find(|existing| key(existing) == id) {
        Some(slot) => {
            *slot = item;
            Ok(())
        }
        None => bail!("{kind} {id} does not exist"),
    }
}

impl CatalogStore for JsonCatalog {
    fn get_product(&self, id: &str) -> Result<Option<Product>> {
        Ok(self.read()?.products.iter().find(|p| p.id == id).cloned())
    }

    fn insert_product(&self, product: Product) -> Result<()> { self.write(|data| push_product(data, product)) }

    fn replace_product(&self, product: Product) -> Result<()> {
        validate_product(&product)?;
        self.write(|data| {
            let id = product.id.clone();
            replace_in(&mut data.products, &id, product, |p| p.id.as_str(), "product")
        })
    }

    fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        Ok(self.read()?.products.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    fn get_category(&self, id: &str) -> Result<Option<Category>> {
        Ok(self.read()?.categories.iter().find(|c| c.id == id).cloned())
    }

    fn insert_category(&self, category: Category) -> Result<()> { self.write(|data| push_category(data, category)) }

    fn replace_category(&self, category: Category) -> Result<()> {
        validate_category(&category)?;
        self.write(|data| {
            let id = category.id.clone();
            replace_in(&mut data.categories, &id, category, |c| c.id.as_str(), "category")
        })
    }

    fn delete_category(&self, id: &str) -> Result<bool> {
        self.write(|data| {
            let before = data.categories.len();
            data.categories.retain(|c| c.id != id);
            Ok(data.categories.len() != before)
        })
    }

    fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        Ok(self.read()?.categories.iter().filter(|c| !active_only || c.is_active).cloned().collect())
    }

    fn child_categories(&self, parent_id: &CategoryId) -> Result<Vec<Category>> {
        Ok(self
            .read()?
            .categories
            .iter()
            .filter(|c| c.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect())
    }

    fn get_review(&self, id: &str) -> Result<Option<Review>> {
        Ok(self.read()?.reviews.iter().find(|r| r.id == id).cloned())
    }

    fn insert_review(&self, review: Review) -> Result<()> { self.write(|data| push_review(data, review)) }

    fn replace_review(&self, review: Review) -> Result<()> {
        validate_review(&review)?;
        self.write(|data| {
            let id = review.id.clone();
            replace_in(&mut data.reviews, &id, review, |r| r.id.as_str(), "review")
        })
    }

    fn delete_review(&self, id: &ReviewId) -> Result<bool> {
        self.write(|data| {
            let before = data.reviews.len();
            data.reviews.retain(|r| &r.id != id);
            Ok(data.reviews.len() != before)
        })
    }

    fn reviews_for(&self, product_id: &str) -> Result<Vec<Review>> {
        Ok(self.read()?.reviews.iter().filter(|r| r.product_id == product_id).cloned().collect())
    }

    fn rating_summary(&self, product_id: &str) -> Result<RatingSummary> {
        let data = self.read()?;
        let ratings: Vec<u8> = data.reviews.iter().filter(|r| r.product_id == product_id).map(|r| r.rating).collect();
        Ok(RatingSummary::from_ratings(&ratings))
    }

    fn get_order(&self, id: &str) -> Result<Option<Order>> {
        Ok(self.read()?.orders.iter().find(|o| o.id == id).cloned())
    }

    fn find_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.read()?.orders.iter().filter(|o| filter.matches(o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    fn replace_order(&self, order: Order) -> Result<()> {
        validate_order(&order)?;
        self.write(|data| {
            let id = order.id.clone();
            replace_in(&mut data.orders, &id, order, |o| o.id.as_str(), "order")
        })
    }

    fn place_order(&self, order: Order) -> Result<()> {
        validate_order(&order)?;
        self.write(|data| {
            if data.orders.iter().any(|o| o.id == order.id) {
                bail!("duplicate order id {}", order.id);
            }
            for item in &order.items {
                let product = product_mut(data, &item.product_id)?;
                let available = product.stock_quantity;
                if available < i64::from(item.quantity) {
                    return Err(Error::InsufficientStock {
                        product_id: item.product_id.clone(),
                        requested: item.quantity,
                        available,
                    }
                    .into());
                }
                product.stock_quantity -= i64::from(item.quantity);
            }
            data.orders.push(order);
            Ok(())
        })
    }

    fn cancel_order(&self, id: &str) -> Result<Order> {
        self.write(|data| {
            let order = data
                .orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| Error::OrderNotFound(id.to_string()))?;
            if order.status != OrderStatus::Pending {
                return Err(Error::InvalidInput(format!("order {id} can only be cancelled while pending")).into());
            }
            order.status = OrderStatus::Cancelled;
            order.updated_at = chrono::Utc::now();
            let cancelled = order.clone();
            for item in &cancelled.items {
                if let Some(product) = data.products.iter_mut().find(|p| p.id == item.product_id) {
                    product.stock_quantity += i64::from(item.quantity);
                }
            }
            Ok(cancelled)
        })
    }
}
