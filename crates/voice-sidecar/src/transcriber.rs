//! Transcription behind a narrow trait.
//!
//! The real ASR engine (whisper.cpp or similar) is an out-of-scope external
//! collaborator; this module only owns the contract and its documented
//! failure behavior: `("", "unknown")` on any failure, so the voice pipeline
//! always succeeds even when no transcript could be produced.

pub struct Transcript {
    pub text: String,
    pub language: String,
}

impl Transcript {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            language: "unknown".to_string(),
        }
    }
}

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: &[f32], sample_rate: u32) -> Transcript;
}

/// Best-effort transcriber used when no real ASR engine is wired in. Always
/// returns the documented empty-transcript failure shape, matching what the
/// pipeline must tolerate from a real engine that cannot load or errors out.
pub struct NullTranscriber;

impl Transcriber for NullTranscriber {
    fn transcribe(&self, _audio: &[f32], _sample_rate: u32) -> Transcript {
        Transcript::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_transcriber_returns_empty_unknown() {
        let t = NullTranscriber;
        let out = t.transcribe(&[0.0; 16_000], 16_000);
        assert_eq!(out.text, "");
        assert_eq!(out.language, "unknown");
    }
}
