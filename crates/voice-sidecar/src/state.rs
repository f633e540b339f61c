use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::fingerprint_store::FingerprintStore;
use crate::pipeline::VoicePipeline;
use crate::speaker_id::SpeakerIdentifier;
use crate::transcriber::Transcriber;
use crate::vad::Vad;

/// Shared, process-wide state for the voice sidecar. Cloning is cheap: every
/// field is an `Arc`, and the fingerprint table is hot-reloadable behind its
/// own internal lock (see [`FingerprintStore::reload`]).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fingerprints: Arc<FingerprintStore>,
    pub pipeline: Arc<VoicePipeline>,
    pub audit: Arc<AuditLog>,
}

impl AppState {
    pub fn new(
        config: Config,
        known_users: &[String],
        transcriber: Arc<dyn Transcriber>,
    ) -> anyhow::Result<Self> {
        let (fingerprints, report) =
            FingerprintStore::load(&config.speaker_id.embeddings_dir, known_users);
        for uid in &report.missing {
            tracing::warn!(user = %uid, "no voice fingerprint on disk at startup");
        }
        let fingerprints = Arc::new(fingerprints);

        // `Vad::new` is infallible in this implementation (no model to load),
        // but the pipeline still threads an `Option<Vad>` through so the
        // documented "VAD init failure -> assume speech" degradation path
        // has somewhere to live if a future VAD backend can fail to load.
        let vad = Some(Vad::new(&config.vad, 16_000));

        let identifier = Arc::new(SpeakerIdentifier::new(fingerprints.clone(), &config.speaker_id));
        let audit = Arc::new(AuditLog::open(&config.audit.log_path)?);
        let pipeline = Arc::new(VoicePipeline::new(
            vad,
            identifier,
            transcriber,
            audit.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            fingerprints,
            pipeline,
            audit,
        })
    }

    pub fn reload_fingerprints(&self) -> crate::fingerprint_store::LoadReport {
        self.fingerprints.reload()
    }
}
