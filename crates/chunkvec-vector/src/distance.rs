//! Similarity measures. Higher scores are always closer.

use chunkvec_core::{Error, Result};

/// Scores two vectors of equal length.
pub type DistanceMeasure = fn(&[f32], &[f32]) -> Result<f32>;

fn same_dim(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected: a.len(), actual: b.len() })
    }
}

/// `dot(a, b) / (|a| * |b|)`, accumulated in f64.
///
/// Fails with [`Error::ZeroVector`] when either norm is zero, where the angle
/// is undefined.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    same_dim(a, b)?;
    let (mut dot, mut norm_a, mut norm_b) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(Error::ZeroVector);
    }
    // sqrt of the product keeps cos(v, v) at exactly 1.0
    let cos = dot / (norm_a * norm_b).sqrt();
    Ok(cos.clamp(-1.0, 1.0) as f32)
}

/// Raw inner product; equals cosine similarity for unit-length vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    same_dim(a, b)?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).sum())
}
