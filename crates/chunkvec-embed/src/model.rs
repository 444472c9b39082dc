//! Sentence-transformer backend: BERT encoder, mean pooling over the
//! attention mask, then L2 normalization.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use chunkvec_core::Embedder;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::pool::l2_normalize;

/// Local sentence-transformer, e.g. a downloaded `all-MiniLM-L6-v2`.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl SentenceEmbedder {
    /// Reads `config.json`, `tokenizer.json` and `model.safetensors` (falling
    /// back to `pytorch_model.bin`) from `dir`. Inputs longer than
    /// `max_length` tokens are truncated.
    pub fn load(dir: &Path, max_length: usize) -> Result<Self> {
        let device = select_device()?;

        let config_path = dir.join("config.json");
        let raw = fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))?;
        let dim = usize::try_from(dim)?;

        let tokenizer_path = dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;
        tokenizer
            .with_padding(Some(PaddingParams { strategy: PaddingStrategy::BatchLongest, ..PaddingParams::default() }))
            .with_truncation(Some(TruncationParams { max_length, ..TruncationParams::default() }))
            .map_err(|e| anyhow!("invalid truncation settings: {e}"))?;

        let vb = VarBuilder::from_tensors(load_weights(dir, &device)?, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(dir = %dir.display(), dim, "loaded sentence embedding model");
        Ok(Self { model, tokenizer, device, dim })
    }

    fn encode(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self.tokenizer.encode_batch(texts, true).map_err(|e| anyhow!("tokenization failed: {e}"))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for enc in &encodings {
            ids.push(Tensor::new(enc.get_ids(), &self.device)?);
            masks.push(Tensor::new(enc.get_attention_mask(), &self.device)?);
        }
        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        // padding positions carry zero weight; special tokens keep every count >= 1
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let pooled = summed.broadcast_div(&mask.sum(1)?)?;

        let mut rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        for row in &mut rows {
            l2_normalize(row);
        }
        debug!(texts = rows.len(), "embedded batch");
        Ok(rows)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(vec![text])?.pop().ok_or_else(|| anyhow!("model returned no embedding"))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.encode(texts.iter().map(String::as_str).collect())
    }
}

fn load_weights(dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device)
            .with_context(|| format!("reading {}", safetensors.display()));
    }
    let pickle = dir.join("pytorch_model.bin");
    debug!(path = %pickle.display(), "no safetensors, reading pytorch weights");
    let weights = candle_core::pickle::read_all(&pickle).with_context(|| format!("reading {}", pickle.display()))?;
    weights
        .into_iter()
        .map(|(name, tensor)| Ok((name, tensor.to_device(device)?)))
        .collect()
}

#[cfg(feature = "metal")]
fn select_device() -> Result<Device> {
    Device::new_metal(0).map_err(|e| anyhow!("failed to initialize Metal device: {e}"))
}

#[cfg(not(feature = "metal"))]
#[allow(clippy::unnecessary_wraps)]
fn select_device() -> Result<Device> {
    Ok(Device::Cpu)
}
