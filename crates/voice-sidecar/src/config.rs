use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub speaker_id: SpeakerIdConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            max_concurrent_requests: d_max_concurrent_requests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    /// RMS energy threshold above which a frame is considered speech.
    #[serde(default = "d_vad_threshold")]
    pub energy_threshold: f32,
    /// Minimum fraction of frames that must be speech for the utterance
    /// as a whole to be considered speech.
    #[serde(default = "d_vad_min_ratio")]
    pub min_speech_ratio: f32,
    #[serde(default = "d_vad_frame_ms")]
    pub frame_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: d_vad_threshold(),
            min_speech_ratio: d_vad_min_ratio(),
            frame_ms: d_vad_frame_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerIdConfig {
    #[serde(default = "d_embeddings_dir")]
    pub embeddings_dir: PathBuf,
    #[serde(default = "d_confidence_high")]
    pub confidence_high: f32,
    #[serde(default = "d_confidence_low")]
    pub confidence_low: f32,
    /// Most-restrictive-first ordering used to break ambiguous-candidate ties.
    #[serde(default = "d_fallback_hierarchy")]
    pub fallback_hierarchy: Vec<String>,
}

impl Default for SpeakerIdConfig {
    fn default() -> Self {
        Self {
            embeddings_dir: d_embeddings_dir(),
            confidence_high: d_confidence_high(),
            confidence_low: d_confidence_low(),
            fallback_hierarchy: d_fallback_hierarchy(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "d_whisper_model")]
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: d_whisper_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "d_audit_path")]
    pub log_path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_path: d_audit_path(),
        }
    }
}

fn d_port() -> u16 {
    10001
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_max_concurrent_requests() -> usize {
    64
}
fn d_vad_threshold() -> f32 {
    0.02
}
fn d_vad_min_ratio() -> f32 {
    0.1
}
fn d_vad_frame_ms() -> u32 {
    30
}
fn d_embeddings_dir() -> PathBuf {
    PathBuf::from("./embeddings")
}
fn d_confidence_high() -> f32 {
    0.75
}
fn d_confidence_low() -> f32 {
    0.60
}
fn d_fallback_hierarchy() -> Vec<String> {
    vec!["child".into(), "teen".into(), "mom".into(), "dad".into()]
}
fn d_whisper_model() -> String {
    "base".into()
}
fn d_audit_path() -> PathBuf {
    PathBuf::from("./data/voice/audit.jsonl")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
        let cfg: Config = toml::from_str(&text)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "server.port".into(),
                message: "port must be nonzero".into(),
            });
        }
        if self.server.max_concurrent_requests == 0 {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "server.max_concurrent_requests".into(),
                message: "must be nonzero".into(),
            });
        }
        if self.speaker_id.confidence_low > self.speaker_id.confidence_high {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "speaker_id".into(),
                message: "confidence_low must not exceed confidence_high".into(),
            });
        }
        if self.speaker_id.fallback_hierarchy.is_empty() {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                field: "speaker_id.fallback_hierarchy".into(),
                message: "empty hierarchy; ambiguous fallback will have no deterministic tiebreak"
                    .into(),
            });
        }
        if self.vad.min_speech_ratio < 0.0 || self.vad.min_speech_ratio > 1.0 {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "vad.min_speech_ratio".into(),
                message: "must be in [0, 1]".into(),
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    fn find_issue<'a>(issues: &'a [ConfigIssue], field: &str) -> Option<&'a ConfigIssue> {
        issues.iter().find(|i| i.field == field)
    }

    #[test]
    fn default_config_is_valid() {
        assert!(valid_config().validate().is_empty());
    }

    #[test]
    fn zero_port_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "server.port").unwrap();
        assert_eq!(issue.severity, Severity::Error);
    }

    #[test]
    fn inverted_confidence_bounds_is_error() {
        let mut cfg = valid_config();
        cfg.speaker_id.confidence_low = 0.9;
        cfg.speaker_id.confidence_high = 0.5;
        assert!(find_issue(&cfg.validate(), "speaker_id").is_some());
    }
}
