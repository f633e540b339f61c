use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Dimensionality of a speaker fingerprint. Matches the on-disk `.npy`
/// artifact format produced by the offline enrollment tool.
pub const EMBEDDING_DIMS: usize = 256;

const TARGET_SR: u32 = 16_000;
const FRAME_LEN: usize = 400;
const HOP_LEN: usize = 160;
const FFT_LEN: usize = 1024;
const MIN_HZ: f32 = 80.0;
const MAX_HZ: f32 = 7_600.0;

/// Computes a 256-dimensional, L2-normalized voiceprint embedding from raw
/// mono audio. Deterministic and model-free: a framed FFT over a Hamming
/// window, log-magnitude spectrum bucketed into `EMBEDDING_DIMS` bands
/// between `MIN_HZ` and `MAX_HZ`, averaged across frames, then normalized.
/// This stands in for the neural voice encoder the enrollment and speaker-ID
/// subsystems in the reference deployment wrap; the pipeline only depends
/// on the embedding being deterministic, fixed-dimension, and such that
/// cosine similarity between same-speaker samples exceeds that between
/// different speakers.
pub fn compute_embedding(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<f32>> {
    if samples.is_empty() {
        anyhow::bail!("cannot compute embedding from empty audio");
    }
    let resampled = if sample_rate == TARGET_SR {
        samples.to_vec()
    } else {
        resample_linear(samples, sample_rate, TARGET_SR)
    };
    if resampled.len() < FRAME_LEN {
        anyhow::bail!("audio too short to compute an embedding");
    }

    let window = hamming_window(FRAME_LEN);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_LEN);

    let bin_hz = TARGET_SR as f32 / FFT_LEN as f32;
    let min_bin = (MIN_HZ / bin_hz).floor().max(1.0) as usize;
    let max_bin = ((MAX_HZ / bin_hz).ceil() as usize).min(FFT_LEN / 2);
    let bins_per_bucket = ((max_bin - min_bin) as f32 / EMBEDDING_DIMS as f32).max(1.0);

    let mut accum = vec![0f32; EMBEDDING_DIMS];
    let mut frame_count = 0usize;

    let mut pos = 0;
    while pos + FRAME_LEN <= resampled.len() {
        let mut buf: Vec<Complex<f32>> = resampled[pos..pos + FRAME_LEN]
            .iter()
            .zip(window.iter())
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();
        buf.resize(FFT_LEN, Complex::new(0.0, 0.0));
        fft.process(&mut buf);

        for (bucket, acc) in accum.iter_mut().enumerate() {
            let lo = min_bin + (bucket as f32 * bins_per_bucket) as usize;
            let hi = (min_bin + ((bucket + 1) as f32 * bins_per_bucket) as usize).min(max_bin);
            let hi = hi.max(lo + 1).min(FFT_LEN / 2);
            let mut mag_sum = 0f32;
            let mut n = 0usize;
            for bin in lo..hi {
                mag_sum += buf[bin].norm();
                n += 1;
            }
            let mag = if n > 0 { mag_sum / n as f32 } else { 0.0 };
            *acc += (mag + 1e-6).ln();
        }
        frame_count += 1;
        pos += HOP_LEN;
    }

    if frame_count == 0 {
        anyhow::bail!("no frames processed");
    }
    for v in accum.iter_mut() {
        *v /= frame_count as f32;
    }
    Ok(l2_normalize(accum))
}

/// Cosine similarity between two pre-normalized embeddings (plain dot
/// product). Returns `None` on dimension mismatch.
pub fn similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

fn hamming_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.54 - 0.46 * (2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32).cos())
        .collect()
}

fn resample_linear(samples: &[f32], from_sr: u32, to_sr: u32) -> Vec<f32> {
    if samples.is_empty() || from_sr == to_sr {
        return samples.to_vec();
    }
    let ratio = to_sr as f64 / from_sr as f64;
    let out_len = ((samples.len() as f64) * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = samples.get(idx).copied().unwrap_or(0.0);
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, secs: f32, sr: u32) -> Vec<f32> {
        let n = (secs * sr as f32) as usize;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn embedding_has_expected_dims_and_unit_norm() {
        let samples = tone(440.0, 1.0, 16_000);
        let emb = compute_embedding(&samples, 16_000).unwrap();
        assert_eq!(emb.len(), EMBEDDING_DIMS);
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3 || norm == 0.0);
    }

    #[test]
    fn same_signal_is_maximally_similar() {
        let samples = tone(220.0, 1.0, 16_000);
        let a = compute_embedding(&samples, 16_000).unwrap();
        let b = compute_embedding(&samples, 16_000).unwrap();
        let sim = similarity(&a, &b).unwrap();
        assert!(sim > 0.999);
    }

    #[test]
    fn different_signals_are_less_similar_than_identical() {
        let a = compute_embedding(&tone(220.0, 1.0, 16_000), 16_000).unwrap();
        let b = compute_embedding(&tone(220.0, 1.0, 16_000), 16_000).unwrap();
        let c = compute_embedding(&tone(3800.0, 1.0, 16_000), 16_000).unwrap();
        let sim_same = similarity(&a, &b).unwrap();
        let sim_diff = similarity(&a, &c).unwrap();
        assert!(sim_same > sim_diff);
    }

    #[test]
    fn empty_audio_errors() {
        assert!(compute_embedding(&[], 16_000).is_err());
    }

    #[test]
    fn resample_changes_length_by_ratio() {
        let samples = vec![0.0f32; 8_000];
        let out = resample_linear(&samples, 8_000, 16_000);
        assert_eq!(out.len(), 16_000);
    }
}
