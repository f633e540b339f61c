use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
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

/// The local chat runtime (treated as a generic "Ollama-shaped" HTTP
/// service: `/api/chat`, `/api/tags`). Out of scope as a product; the
/// contract this sidecar consumes is in scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "d_runtime_url")]
    pub base_url: String,
    #[serde(default = "d_fast_model")]
    pub fast_model: String,
    #[serde(default = "d_full_model")]
    pub full_model: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: d_runtime_url(),
            fast_model: d_fast_model(),
            full_model: d_full_model(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

/// The embedding backend, reached the same way the reference codebase
/// reaches Ollama for embeddings: a plain HTTP POST, no vendored model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "d_embedding_url")]
    pub base_url: String,
    #[serde(default = "d_embedding_model")]
    pub model: String,
    #[serde(default = "d_embedding_dims")]
    pub dims: usize,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: d_embedding_url(),
            model: d_embedding_model(),
            dims: d_embedding_dims(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

/// A Chroma-compatible vector database, consumed purely as an HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    #[serde(default = "d_vectordb_url")]
    pub base_url: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            base_url: d_vectordb_url(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "d_chat_top_k")]
    pub chat_top_k: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            chat_top_k: d_chat_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "d_fast_threshold_words")]
    pub fast_threshold_words: usize,
    #[serde(default = "d_full_threshold_words")]
    pub full_threshold_words: usize,
    #[serde(default = "d_conversational_phrases")]
    pub conversational_phrases: Vec<String>,
    #[serde(default = "d_complexity_phrases")]
    pub complexity_phrases: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fast_threshold_words: d_fast_threshold_words(),
            full_threshold_words: d_full_threshold_words(),
            conversational_phrases: d_conversational_phrases(),
            complexity_phrases: d_complexity_phrases(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreference {
    Fast,
    Full,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub model_preference: Option<ModelPreference>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn d_port() -> u16 {
    10002
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_max_concurrent_requests() -> usize {
    64
}
fn d_runtime_url() -> String {
    "http://127.0.0.1:11434".into()
}
fn d_fast_model() -> String {
    "llama3.2:3b".into()
}
fn d_full_model() -> String {
    "llama3.1:8b".into()
}
fn d_timeout_ms() -> u64 {
    15_000
}
fn d_embedding_url() -> String {
    "http://127.0.0.1:11434".into()
}
fn d_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn d_embedding_dims() -> usize {
    384
}
fn d_vectordb_url() -> String {
    "http://127.0.0.1:8000".into()
}
fn d_chat_top_k() -> usize {
    5
}
fn d_fast_threshold_words() -> usize {
    8
}
fn d_full_threshold_words() -> usize {
    60
}
fn d_conversational_phrases() -> Vec<String> {
    vec![
        "bonjour".into(),
        "salut".into(),
        "merci".into(),
        "ca va".into(),
        "quoi de neuf".into(),
        "comment vas-tu".into(),
        "bonne nuit".into(),
    ]
}
fn d_complexity_phrases() -> Vec<String> {
    vec![
        "explique".into(),
        "analyse".into(),
        "pourquoi".into(),
        "compare".into(),
        "demontre".into(),
        "en detail".into(),
        "etape par etape".into(),
    ]
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
        for (field, url) in [
            ("runtime.base_url", &self.runtime.base_url),
            ("embedding.base_url", &self.embedding.base_url),
            ("vector_db.base_url", &self.vector_db.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                issues.push(ConfigIssue {
                    severity: Severity::Error,
                    field: field.into(),
                    message: "must be an http(s) URL".into(),
                });
            }
        }
        if self.classifier.fast_threshold_words >= self.classifier.full_threshold_words {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "classifier".into(),
                message: "fast_threshold_words must be less than full_threshold_words".into(),
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn inverted_word_thresholds_is_error() {
        let mut cfg = Config::default();
        cfg.classifier.fast_threshold_words = 100;
        cfg.classifier.full_threshold_words = 10;
        assert!(!cfg.validate().is_empty());
    }

    #[test]
    fn non_http_runtime_url_is_error() {
        let mut cfg = Config::default();
        cfg.runtime.base_url = "ftp://example.com".into();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.field == "runtime.base_url"));
    }
}
