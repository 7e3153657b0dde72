use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Everything the feature extractor needs about one signature, gathered
/// from the coordinator's behavior snapshot plus request-derived
/// geo/network context.
pub struct SignatureContext<'a> {
    pub signature: &'a str,
    pub timing_regularity: f64,
    pub request_rate: f64,
    pub path_diversity: f64,
    pub path_entropy: f64,
    pub avg_bot_probability: f64,
    pub country: &'a str,
    pub is_datacenter: bool,
    pub asn: u32,
    /// Inter-arrival intervals in milliseconds, oldest first.
    pub inter_arrival_ms: &'a [f64],
}

/// The 12-dimensional feature vector clustering runs on. Country and ASN
/// don't fit a fixed-width one-hot without an unbounded vocabulary, so
/// both collapse to a stable hash bucketed into `[0, 1)` — a categorical
/// match still means an exact match, it just costs one dimension
/// instead of one-per-country.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; 12]);

const NEUTRAL_SPECTRAL: f64 = 0.5;
const MIN_SAMPLES_FOR_FFT: usize = 9;

impl FeatureVector {
    pub fn extract(ctx: &SignatureContext<'_>) -> Self {
        let (spectral_entropy, harmonic_ratio, peak_to_average, dominant_frequency) =
            if ctx.inter_arrival_ms.len() >= MIN_SAMPLES_FOR_FFT {
                spectral_features(ctx.inter_arrival_ms)
            } else {
                (NEUTRAL_SPECTRAL, NEUTRAL_SPECTRAL, NEUTRAL_SPECTRAL, NEUTRAL_SPECTRAL)
            };

        Self([
            ctx.timing_regularity.clamp(0.0, 1.0),
            ctx.request_rate.max(0.0),
            ctx.path_diversity.clamp(0.0, 1.0),
            ctx.path_entropy.max(0.0),
            ctx.avg_bot_probability.clamp(0.0, 1.0),
            category_bucket(ctx.country),
            if ctx.is_datacenter { 1.0 } else { 0.0 },
            category_bucket(&ctx.asn.to_string()),
            spectral_entropy,
            harmonic_ratio,
            peak_to_average,
            dominant_frequency,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Deterministic `[0, 1)` bucket for a categorical value, stable across
/// runs and processes (no `RandomState` hashing involved).
fn category_bucket(value: &str) -> f64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in value.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % 10_000) as f64 / 10_000.0
}

/// Spectral entropy, harmonic ratio, peak-to-average magnitude, and
/// dominant frequency of the inter-arrival series, via FFT. Evenly
/// timed bots show a sharp dominant frequency and low spectral entropy;
/// humans look closer to noise.
fn spectral_features(intervals: &[f64]) -> (f64, f64, f64, f64) {
    let n = intervals.len();
    let mean = intervals.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> =
        intervals.iter().map(|v| Complex::new(v - mean, 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let half = n / 2;
    let magnitudes: Vec<f64> = buffer[..half.max(1)].iter().map(|c| c.norm()).collect();
    let total: f64 = magnitudes.iter().sum();

    if total <= f64::EPSILON || magnitudes.is_empty() {
        return (NEUTRAL_SPECTRAL, NEUTRAL_SPECTRAL, NEUTRAL_SPECTRAL, NEUTRAL_SPECTRAL);
    }

    let spectral_entropy = {
        let h = -magnitudes
            .iter()
            .map(|&m| {
                let p = m / total;
                if p > 0.0 {
                    p * p.log2()
                } else {
                    0.0
                }
            })
            .sum::<f64>();
        let max_h = (magnitudes.len() as f64).log2().max(f64::EPSILON);
        (h / max_h).clamp(0.0, 1.0)
    };

    let peak = magnitudes.iter().cloned().fold(0.0_f64, f64::max);
    let average = total / magnitudes.len() as f64;
    let peak_to_average = if average > 0.0 { (peak / average / magnitudes.len() as f64).min(1.0) } else { 0.0 };

    let dominant_bin = magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let dominant_frequency = dominant_bin as f64 / half.max(1) as f64;

    let harmonic_energy: f64 = (2..magnitudes.len())
        .step_by(dominant_bin.max(1))
        .map(|i| magnitudes.get(i).copied().unwrap_or(0.0))
        .sum();
    let harmonic_ratio = (harmonic_energy / total).min(1.0);

    (spectral_entropy, harmonic_ratio, peak_to_average, dominant_frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_uses_neutral_spectral_features() {
        let ctx = SignatureContext {
            signature: "s1",
            timing_regularity: 0.9,
            request_rate: 10.0,
            path_diversity: 0.2,
            path_entropy: 1.0,
            avg_bot_probability: 0.8,
            country: "US",
            is_datacenter: true,
            asn: 12345,
            inter_arrival_ms: &[100.0, 110.0, 95.0],
        };
        let features = FeatureVector::extract(&ctx);
        assert_eq!(features.0[8], NEUTRAL_SPECTRAL);
        assert_eq!(features.0[9], NEUTRAL_SPECTRAL);
    }

    #[test]
    fn category_bucket_is_deterministic() {
        assert_eq!(category_bucket("US"), category_bucket("US"));
        assert_ne!(category_bucket("US"), category_bucket("DE"));
    }

    #[test]
    fn perfectly_regular_series_has_low_spectral_entropy() {
        let intervals: Vec<f64> = (0..16).map(|i| 100.0 + (i as f64 * std::f64::consts::PI / 4.0).sin() * 0.001).collect();
        let (entropy, _, _, _) = spectral_features(&intervals);
        assert!(entropy <= 1.0);
    }
}
