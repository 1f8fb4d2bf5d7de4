use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use catalogdb_core::traits::Embedder;
use catalogdb_core::types::ImageInput;

use crate::device::select_device;
use crate::image_io::resize_square;
use crate::math::l2_normalize;

pub const CLIP_DIM: usize = 512;
const IMAGE_SIZE: usize = 224;
const MAX_TOKENS: usize = 77;
const EOS_TOKEN: &str = "<|endoftext|>";

/// CLIP ViT-B/32: images and text land in the same 512-d space.
///
/// Expects `tokenizer.json` and `model.safetensors` in the model directory.
pub struct ClipEmbedder {
    model: ClipModel,
    tokenizer: Tokenizer,
    device: Device,
    eos_id: u32,
    id: String,
}

impl ClipEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading CLIP model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let eos_id = tokenizer
            .token_to_id(EOS_TOKEN)
            .ok_or_else(|| anyhow!("tokenizer has no {} token", EOS_TOKEN))?;
        let weights_path = model_dir.join("model.safetensors");
        let weights = candle_core::safetensors::load(&weights_path, &device)
            .map_err(|e| anyhow!("Failed to load weights from {}: {}", weights_path.display(), e))?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let config = ClipConfig::vit_base_patch32();
        let model = ClipModel::new(vb, &config)?;
        info!("CLIP model loaded");
        Ok(Self { model, tokenizer, device, eos_id, id: format!("clip-vit-b32:d{CLIP_DIM}") })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let enc = self.tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut ids = enc.get_ids().to_vec();
        if ids.len() > MAX_TOKENS {
            ids.truncate(MAX_TOKENS);
            ids[MAX_TOKENS - 1] = self.eos_id;
        }
        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let features = self.model.get_text_features(&input_ids)?;
        self.to_unit_vec(&features)
    }

    fn to_unit_vec(&self, features: &Tensor) -> Result<Vec<f32>> {
        let mut v = features.squeeze(0)?.to_device(&Device::Cpu)?.to_vec1::<f32>()?;
        if v.len() != CLIP_DIM {
            return Err(anyhow!("dim mismatch: got {} expected {}", v.len(), CLIP_DIM));
        }
        l2_normalize(&mut v);
        Ok(v)
    }
}

impl Embedder for ClipEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { CLIP_DIM }

    fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }

    fn embed_image(&self, image: &ImageInput) -> Result<Vec<f32>> {
        let start = Instant::now();
        let pixels = resize_square(image, IMAGE_SIZE as u32)?;
        let pixel_values = Tensor::from_vec(pixels, (IMAGE_SIZE, IMAGE_SIZE, 3), &Device::Cpu)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?
            .affine(2. / 255., -1.)?
            .unsqueeze(0)?
            .to_device(&self.device)?;
        let features = self.model.get_image_features(&pixel_values)?;
        let v = self.to_unit_vec(&features)?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "image embedded");
        Ok(v)
    }
}
