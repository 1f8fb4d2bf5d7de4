use tracing::warn;

use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{Product, ProductSummary, RatingSummary};

/// Attach `average_rating`/`review_count` to each product.
///
/// Aggregation failures degrade to `null`/0 for that product and are logged.
pub fn attach_ratings(store: &dyn CatalogStore, products: Vec<Product>) -> Vec<ProductSummary> {
    products
        .into_iter()
        .map(|product| {
            let rating = store.rating_summary(&product.id).unwrap_or_else(|e| {
                warn!(product_id = %product.id, error = %e, "rating aggregation failed");
                RatingSummary::default()
            });
            ProductSummary::new(product, rating)
        })
        .collect()
}
