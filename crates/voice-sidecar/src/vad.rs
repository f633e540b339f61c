use crate::config::VadConfig;

/// Voice activity detection. The reference system wraps a neural VAD model;
/// that model is out of scope here, so this implements the same contract
/// with a deterministic energy-based detector: RMS energy per frame,
/// thresholded, with the overall speech ratio driving the final verdict.
pub struct Vad {
    energy_threshold: f32,
    min_speech_ratio: f32,
    frame_len: usize,
}

impl Vad {
    pub fn new(config: &VadConfig, sample_rate: u32) -> Self {
        let frame_len = ((sample_rate as u64 * config.frame_ms as u64) / 1000).max(1) as usize;
        Self {
            energy_threshold: config.energy_threshold,
            min_speech_ratio: config.min_speech_ratio,
            frame_len,
        }
    }

    /// Returns `(has_speech, speech_ratio)`. Never fails: an empty buffer is
    /// simply reported as no speech at ratio 0.0. Callers that cannot even
    /// construct a `Vad` (init failure) should proceed assuming speech
    /// rather than calling this at all, per the pipeline's failure-isolation
    /// contract.
    pub fn detect_speech(&self, audio: &[f32]) -> (bool, f32) {
        if audio.is_empty() {
            return (false, 0.0);
        }
        let mut speech_frames = 0usize;
        let mut total_frames = 0usize;
        for frame in audio.chunks(self.frame_len) {
            total_frames += 1;
            let energy = rms(frame);
            if energy >= self.energy_threshold {
                speech_frames += 1;
            }
        }
        let ratio = speech_frames as f32 / total_frames.max(1) as f32;
        (ratio >= self.min_speech_ratio, ratio)
    }
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
    (sum_sq / frame.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VadConfig {
        VadConfig {
            energy_threshold: 0.02,
            min_speech_ratio: 0.1,
            frame_ms: 30,
        }
    }

    #[test]
    fn silence_is_not_speech() {
        let vad = Vad::new(&config(), 16_000);
        let silence = vec![0.0f32; 16_000];
        let (has_speech, ratio) = vad.detect_speech(&silence);
        assert!(!has_speech);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn loud_tone_is_speech() {
        let vad = Vad::new(&config(), 16_000);
        let tone: Vec<f32> = (0..16_000)
            .map(|i| (i as f32 * 0.1).sin() * 0.5)
            .collect();
        let (has_speech, ratio) = vad.detect_speech(&tone);
        assert!(has_speech);
        assert!(ratio > 0.5);
    }

    #[test]
    fn empty_buffer_is_no_speech() {
        let vad = Vad::new(&config(), 16_000);
        let (has_speech, ratio) = vad.detect_speech(&[]);
        assert!(!has_speech);
        assert_eq!(ratio, 0.0);
    }
}
