use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::ProductFilter;
use catalogdb_core::{Error, Result};

use crate::indexer::ProductIndexer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub indexed: usize,
    /// Active products without any image.
    pub skipped: usize,
    pub failed: usize,
}

/// Re-embed every active product and upsert it into the index.
///
/// A single product failing (unreachable image, provider error) is logged and
/// counted; the pass continues with the next product.
pub async fn backfill_embeddings(store: &dyn CatalogStore, indexer: &ProductIndexer, show_progress: bool) -> Result<BackfillReport> {
    let products = store.find_products(&ProductFilter::active()).map_err(Error::storage)?;
    let pb = if show_progress { ProgressBar::new(products.len() as u64) } else { ProgressBar::hidden() };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} products {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut report = BackfillReport::default();
    for product in &products {
        pb.set_message(product.name.clone());
        if product.representative_image().is_none() {
            report.skipped += 1;
        } else {
            match indexer.index_product(product).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    warn!(product_id = %product.id, error = %e, "embedding backfill failed");
                    report.failed += 1;
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(indexed = report.indexed, skipped = report.skipped, failed = report.failed, "embedding backfill finished");
    Ok(report)
}
