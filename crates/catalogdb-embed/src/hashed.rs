use anyhow::{bail, Result};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use catalogdb_core::traits::Embedder;
use catalogdb_core::types::ImageInput;

use crate::math::l2_normalize;

/// Deterministic embedder for tests and offline development.
///
/// Text: every whitespace token is hashed into a bucket. Images: every pixel
/// is quantised into a 4x4x4 colour cube and the cube cell is hashed into a
/// bucket weighted by its share of the image. Outputs are L2-normalised.
pub struct HashedEmbedder {
    dim: usize,
    id: String,
}

const COLOUR_LEVELS: u8 = 4;

impl HashedEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            bail!("hashed embedder needs a positive dimension");
        }
        Ok(Self { dim, id: format!("hashed:d{dim}") })
    }

    fn bucket<T: Hash + ?Sized>(&self, key: &T) -> (usize, f32) {
        let mut hasher = XxHash64::with_seed(0);
        key.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h as usize) % self.dim;
        let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        (idx, val)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
            let (idx, val) = self.bucket(token);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashedEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn embed_image(&self, image: &ImageInput) -> Result<Vec<f32>> {
        let step = 256 / u16::from(COLOUR_LEVELS);
        let cells = usize::from(COLOUR_LEVELS).pow(3);
        let mut histogram = vec![0u32; cells];
        for px in image.pixels().chunks_exact(3) {
            let q = |c: u8| (u16::from(c) / step) as usize;
            let levels = usize::from(COLOUR_LEVELS);
            histogram[(q(px[0]) * levels + q(px[1])) * levels + q(px[2])] += 1;
        }
        let total = histogram.iter().sum::<u32>().max(1) as f32;
        let mut v = vec![0f32; self.dim];
        for (cell, &count) in histogram.iter().enumerate() {
            if count == 0 { continue; }
            let (idx, val) = self.bucket(&format!("rgb:{cell}"));
            v[idx] += (count as f32 / total) * (0.5 + val);
        }
        l2_normalize(&mut v);
        Ok(v)
    }
}
