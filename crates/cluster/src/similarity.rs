use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::features::FeatureVector;

/// Blend weights per §4.8: semantic 0.4 / heuristic 0.6 when a semantic
/// embedding is supplied, temporal cross-correlation folded in at 0.15
/// when both interval series are long enough to FFT.
pub const SEMANTIC_WEIGHT: f64 = 0.4;
pub const HEURISTIC_WEIGHT: f64 = 0.6;
pub const TEMPORAL_WEIGHT: f64 = 0.15;

pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let (a, b) = (a.as_slice(), b.as_slice());
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// A 384-dim bag-of-hashed-tokens embedding of a privacy-safe textual
/// summary (e.g. "scraper ua; high path entropy; datacenter ip"). No
/// model involved — tokens hash into buckets, counts normalise to unit
/// length, so two summaries sharing vocabulary land close together.
pub fn hashed_embedding(summary: &str) -> [f64; 384] {
    let mut vector = [0.0f64; 384];
    for token in summary.split_whitespace() {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % 384) as usize] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

pub fn semantic_cosine(a: &[f64; 384], b: &[f64; 384]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot.clamp(-1.0, 1.0)
}

/// Blends heuristic cosine similarity with an optional semantic
/// similarity per the configured weights.
pub fn blended_similarity(heuristic: f64, semantic: Option<f64>) -> f64 {
    match semantic {
        Some(s) => (SEMANTIC_WEIGHT * s + HEURISTIC_WEIGHT * heuristic).clamp(0.0, 1.0),
        None => heuristic.clamp(0.0, 1.0),
    }
}

/// Temporal cross-correlation between two inter-arrival series via FFT
/// convolution, normalised to `[-1, 1]`. `None` when either series is
/// too short.
pub fn temporal_cross_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    const MIN_LEN: usize = 9;
    if a.len() < MIN_LEN || b.len() < MIN_LEN {
        return None;
    }
    let n = a.len().max(b.len()).next_power_of_two() * 2;
    let mut fa: Vec<Complex<f64>> = a.iter().map(|v| Complex::new(*v, 0.0)).collect();
    let mut fb: Vec<Complex<f64>> = b.iter().map(|v| Complex::new(*v, 0.0)).collect();
    fa.resize(n, Complex::new(0.0, 0.0));
    fb.resize(n, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut fa);
    fft.process(&mut fb);

    let mut product: Vec<Complex<f64>> = fa.iter().zip(&fb).map(|(x, y)| *x * y.conj()).collect();
    let ifft = planner.plan_fft_inverse(n);
    ifft.process(&mut product);

    let peak = product.iter().map(|c| c.norm()).fold(0.0_f64, f64::max) / n as f64;
    let norm_a = (a.iter().map(|v| v * v).sum::<f64>()).sqrt();
    let norm_b = (b.iter().map(|v| v * v).sum::<f64>()).sqrt();
    if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
        return Some(0.0);
    }
    Some((peak / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_are_perfectly_similar() {
        let v = FeatureVector([0.5; 12]);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn short_series_has_no_temporal_correlation() {
        assert!(temporal_cross_correlation(&[1.0, 2.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn hashed_embedding_is_unit_length() {
        let e = hashed_embedding("scraper ua high path entropy datacenter ip");
        let norm: f64 = e.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
