//! chunkvec-embed
//!
//! Embedding backends behind [`chunkvec_core::Embedder`].
//!
//! - [`HashEmbedder`]: deterministic feature hashing, no model files; used
//!   offline, by tests, and whenever `embedding.model_dir` is unset.
//! - `SentenceEmbedder` (feature `model`): a BERT sentence-transformer loaded
//!   with candle from a local model directory.

#[cfg(feature = "model")]
pub mod model;
pub mod pool;
pub mod tokenize;

use std::hash::Hasher;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use chunkvec_core::config::{expand_path, EmbedConfig};
use chunkvec_core::Embedder;
use twox_hash::XxHash64;

#[cfg(feature = "model")]
pub use model::SentenceEmbedder;
pub use pool::l2_normalize;
pub use tokenize::tokenize;

/// Stand-in token for texts such as `""` or `* * *` that carry no words.
pub const EMPTY_TOKEN: &str = "";

/// Hashes each token into one of `dim` buckets with a hash-derived sign, then
/// L2-normalizes. Texts sharing words get positive cosine similarity. A text
/// whose tokens leave every bucket at zero hashes [`EMPTY_TOKEN`] instead, so
/// every vector has unit norm and stays comparable under cosine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            bail!("embedding dimension must be greater than zero");
        }
        Ok(Self { dim })
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokenize(text) {
            self.add(&mut v, &token);
        }
        // no words, or colliding tokens with opposite signs cancelled out
        if v.iter().all(|x| *x == 0.0) {
            self.add(&mut v, EMPTY_TOKEN);
        }
        l2_normalize(&mut v);
        v
    }

    fn add(&self, v: &mut [f32], token: &str) {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        let h = hasher.finish();
        // dim fits in u64 on every supported target
        let idx = (h % self.dim as u64) as usize;
        v[idx] += if h >> 63 == 0 { 1.0 } else { -1.0 };
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

/// The model backend when `embedding.model_dir` is set, the hashing embedder
/// otherwise.
pub fn default_embedder(config: &EmbedConfig) -> Result<Arc<dyn Embedder>> {
    match config.model_dir.as_deref() {
        Some(dir) => model_embedder(&expand_path(dir), config),
        None => {
            tracing::info!(dim = config.dim, "using hashing embedder");
            Ok(Arc::new(HashEmbedder::new(config.dim)?))
        }
    }
}

#[cfg(feature = "model")]
fn model_embedder(dir: &Path, config: &EmbedConfig) -> Result<Arc<dyn Embedder>> {
    let embedder = SentenceEmbedder::load(dir, config.max_length)?;
    if embedder.dim() != config.dim {
        tracing::warn!(configured = config.dim, model = embedder.dim(), "embedding.dim ignored, using the model's hidden size");
    }
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "model"))]
fn model_embedder(dir: &Path, _config: &EmbedConfig) -> Result<Arc<dyn Embedder>> {
    bail!(
        "embedding.model_dir is set to {} but chunkvec-embed was built without the `model` feature",
        dir.display()
    )
}
