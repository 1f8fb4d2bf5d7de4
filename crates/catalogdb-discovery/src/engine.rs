use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use catalogdb_core::config::{ClassifierSettings, SearchSettings};
use catalogdb_core::traits::CatalogStore;
use catalogdb_core::types::{
    CategoryId, ImageInput, ImageSearchResult, Product, ProductDetail, ProductFilter, ProductSummary, SearchRequest,
};
use catalogdb_core::{Error, Result};
use catalogdb_embed::decode_image;
use catalogdb_vector::ProductIndexer;

use crate::category::descendant_category_ids;
use crate::classifier::{CategoryClassifier, Classification};
use crate::compose::{merge_candidates, resolve_pagination};
use crate::ratings::attach_ratings;

/// Read side of the catalog: listing/search, image classification and
/// visually similar items.
pub struct Discovery {
    store: Arc<dyn CatalogStore>,
    indexer: ProductIndexer,
    classifier: CategoryClassifier,
    settings: SearchSettings,
}

impl Discovery {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        indexer: ProductIndexer,
        settings: SearchSettings,
        classifier: &ClassifierSettings,
    ) -> Self {
        let classifier = CategoryClassifier::new(
            indexer.clone(),
            std::time::Duration::from_secs(classifier.cache_ttl_secs),
        );
        Self { store, indexer, classifier, settings }
    }

    /// List active products matching the request's filters.
    ///
    /// With search text, semantic candidates (top `limit` by similarity) come
    /// first and keyword matches follow. If the embedding side is unavailable
    /// the result is exactly the keyword matches. Pagination applies to the
    /// merged sequence.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<ProductSummary>> {
        let page = resolve_pagination(&self.settings, request.skip, request.limit)?;
        let filter = self.structural_filter(request)?;
        let query = request.search.as_deref().map(str::trim).filter(|q| !q.is_empty());

        let candidates = match query {
            None => self.store.find_products(&filter).map_err(Error::from_store)?,
            Some(q) => {
                let semantic = self.semantic_candidates(q, page.limit, &filter).await?;
                let keyword = self.store.find_products(&filter.clone().with_text(q)).map_err(Error::from_store)?;
                debug!(query = q, semantic = semantic.len(), keyword = keyword.len(), "search candidates");
                merge_candidates(semantic, keyword)
            }
        };
        Ok(attach_ratings(self.store.as_ref(), page.apply(candidates)))
    }

    pub async fn classify(&self, image: ImageInput) -> Result<Classification> {
        self.classifier.classify(self.store.as_ref(), image).await
    }

    /// Classify an uploaded image and return the active products of the winning category.
    pub async fn search_by_image(&self, bytes: &[u8]) -> Result<ImageSearchResult> {
        let image = decode_image(bytes).map_err(|e| Error::InvalidInput(format!("{e:#}")))?;
        let Classification { category_id, similarity } = self.classify(image).await?;
        let mut filter = ProductFilter::active();
        filter.category_ids = Some(HashSet::from([category_id.clone()]));
        let products = self.store.find_products(&filter).map_err(Error::from_store)?;
        Ok(ImageSearchResult { category_id, similarity, products: attach_ratings(self.store.as_ref(), products) })
    }

    /// A product with its ratings and up to `search.related_items` visually similar products.
    pub async fn product_detail(&self, id: &str) -> Result<ProductDetail> {
        let product = self
            .store
            .get_product(id)
            .map_err(Error::from_store)?
            .ok_or_else(|| Error::ProductNotFound(id.to_string()))?;
        let related_products = self.related_items(&product).await;
        let mut summaries = attach_ratings(self.store.as_ref(), vec![product]);
        let summary = summaries.pop().ok_or_else(|| Error::ProductNotFound(id.to_string()))?;
        Ok(ProductDetail { summary, related_products })
    }

    /// Nearest neighbours of the product's representative image, never the
    /// product itself. Every failure degrades to an empty list.
    pub async fn related_items(&self, product: &Product) -> Vec<ProductSummary> {
        match self.try_related_items(product).await {
            Ok(items) => items,
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "related items unavailable");
                Vec::new()
            }
        }
    }

    pub fn descendant_category_ids(&self, root: &CategoryId) -> Result<Vec<CategoryId>> {
        descendant_category_ids(self.store.as_ref(), root)
    }

    async fn try_related_items(&self, product: &Product) -> Result<Vec<ProductSummary>> {
        let n = self.settings.related_items;
        if n == 0 || product.representative_image().is_none() {
            return Ok(Vec::new());
        }
        let vector = self.indexer.embed_product(product).await?;
        let hits = self.indexer.nearest(&vector, n + 1).await?;
        let mut related = Vec::with_capacity(n);
        for hit in hits.into_iter().filter(|h| h.id != product.id) {
            if related.len() == n { break; }
            match self.store.get_product(&hit.id).map_err(Error::from_store)? {
                Some(p) if p.is_active => related.push(p),
                _ => debug!(product_id = %hit.id, "stale neighbour skipped"),
            }
        }
        Ok(attach_ratings(self.store.as_ref(), related))
    }

    async fn semantic_candidates(&self, query: &str, limit: usize, filter: &ProductFilter) -> Result<Vec<Product>> {
        let hits = match self.indexer.embed_text(query).await {
            Ok(vector) => self.indexer.nearest(&vector, limit).await,
            Err(e) => Err(e),
        };
        let hits = match hits {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "semantic search unavailable, falling back to keyword matches");
                return Ok(Vec::new());
            }
        };
        let mut products = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(product) = self.store.get_product(&hit.id).map_err(Error::from_store)? {
                if filter.matches(&product) {
                    products.push(product);
                }
            }
        }
        Ok(products)
    }

    fn structural_filter(&self, request: &SearchRequest) -> Result<ProductFilter> {
        if let (Some(min), Some(max)) = (request.min_price, request.max_price) {
            if min > max {
                return Err(Error::InvalidInput(format!("min_price {min} exceeds max_price {max}")));
            }
        }
        let mut filter = ProductFilter::active();
        if let Some(category_id) = &request.category_id {
            if self.store.get_category(category_id).map_err(Error::from_store)?.is_none() {
                return Err(Error::CategoryNotFound(category_id.clone()));
            }
            filter.category_ids = Some(self.descendant_category_ids(category_id)?.into_iter().collect());
        }
        filter.merchant_id = request.merchant_id.clone();
        filter.min_price = request.min_price;
        filter.max_price = request.max_price;
        Ok(filter)
    }
}
