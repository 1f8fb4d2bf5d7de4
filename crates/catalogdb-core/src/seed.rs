//! Seed bundles: JSON files holding categories, products, reviews and orders.
//!
//! A directory is walked recursively and every `*.json` bundle is merged in
//! sorted path order, so a catalog can be split across files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Category, Order, Product, Review};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedBundle {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl SeedBundle {
    pub fn merge(&mut self, other: SeedBundle) {
        self.categories.extend(other.categories);
        self.products.extend(other.products);
        self.reviews.extend(other.reviews);
        self.orders.extend(other.orders);
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.products.is_empty() && self.reviews.is_empty() && self.orders.is_empty()
    }
}

/// Load a single bundle file or every bundle under a directory.
pub fn load_seed_path(path: &Path) -> Result<SeedBundle> {
    if !path.exists() {
        bail!("seed path {} does not exist", path.display());
    }
    if path.is_file() {
        return read_bundle(path);
    }
    let files = list_json_files(path)?;
    let mut bundle = SeedBundle::default();
    for file in &files {
        bundle.merge(read_bundle(file)?);
    }
    Ok(bundle)
}

fn read_bundle(path: &Path) -> Result<SeedBundle> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
}

fn list_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut json_files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walking seed directory {}", root.display()))?;
        if entry.file_type().is_file() && entry.path().extension().and_then(|s| s.to_str()) == Some("json") {
            json_files.push(entry.into_path());
        }
    }
    json_files.sort();
    Ok(json_files)
}
