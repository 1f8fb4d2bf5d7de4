//! catalogdb-embed
//!
//! Embedding providers for the discovery engine. Both implementations map
//! images and text into a single space so category names can be compared
//! against product photos.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use catalogdb_core::config::{expand_path, EmbedProviderKind, EmbedSettings};
use catalogdb_core::traits::Embedder;

pub mod clip;
pub mod device;
pub mod fetch;
pub mod hashed;
pub mod image_io;
pub mod math;

pub use clip::ClipEmbedder;
pub use fetch::UrlImageFetcher;
pub use hashed::HashedEmbedder;
pub use image_io::decode_image;
pub use math::{cosine_similarity, l2_normalize};

/// Pick the provider from settings. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashed embedder regardless of configuration.
pub fn get_default_embedder(settings: &EmbedSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake || settings.provider == EmbedProviderKind::Hashed {
        info!(dim = settings.dim, "using hashed embedder");
        return Ok(Arc::new(HashedEmbedder::new(settings.dim)?));
    }
    let model_dir = resolve_model_dir(settings)?;
    Ok(Arc::new(ClipEmbedder::load(&model_dir)?))
}

fn resolve_model_dir(settings: &EmbedSettings) -> Result<PathBuf> {
    if let Some(dir) = &settings.model_dir {
        let p = expand_path(dir);
        if p.exists() { return Ok(p); }
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() { return Ok(p); }
    }
    let fallback = PathBuf::from("models/clip-vit-base-patch32");
    if fallback.exists() { return Ok(fallback); }
    Err(anyhow!("Could not locate CLIP model directory"))
}
