use std::collections::HashSet;

use catalogdb_core::config::SearchSettings;
use catalogdb_core::types::{Pagination, Product};
use catalogdb_core::{Error, Result};

/// Semantic candidates first in rank order, then keyword-only matches in the
/// order they were given. Ids appearing in both keep their semantic rank.
pub fn merge_candidates(semantic: Vec<Product>, keyword: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::with_capacity(semantic.len() + keyword.len());
    semantic
        .into_iter()
        .chain(keyword)
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

/// `limit` defaults to `search.default_limit` and must lie in `1..=search.max_limit`.
pub fn resolve_pagination(settings: &SearchSettings, skip: usize, limit: Option<usize>) -> Result<Pagination> {
    let limit = limit.unwrap_or(settings.default_limit);
    if limit == 0 || limit > settings.max_limit {
        return Err(Error::InvalidInput(format!("limit must be between 1 and {}, got {limit}", settings.max_limit)));
    }
    Ok(Pagination { skip, limit })
}
