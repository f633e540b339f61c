use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm_sidecar: LlmSidecarConfig,
    #[serde(default)]
    pub vendor: VendorConfig,
    #[serde(default)]
    pub gates: GatesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
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

/// Connection to the LLM sidecar, used both as the "remote LLM" gate G1/G2a
/// call (via `/chat`, impersonating a configured gate user) and as the
/// commit target (`/memory/add`) once a correction is approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSidecarConfig {
    #[serde(default = "d_llm_sidecar_url")]
    pub base_url: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_gate_user_id")]
    pub gate_user_id: String,
}

impl Default for LlmSidecarConfig {
    fn default() -> Self {
        Self {
            base_url: d_llm_sidecar_url(),
            timeout_ms: d_timeout_ms(),
            gate_user_id: d_gate_user_id(),
        }
    }
}

/// The external fact-check LLM vendor (G2b). `api_key` left unset disables
/// the gate, which then auto-passes rather than blocking the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "d_vendor_url")]
    pub base_url: String,
    /// Name of the environment variable holding the vendor API key, never
    /// the secret itself — resolved once at startup (see
    /// [`VendorConfig::resolve_api_key`]).
    #[serde(default = "d_vendor_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_vendor_model")]
    pub model: String,
    #[serde(default = "d_vendor_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "d_vendor_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_vendor_max_retries")]
    pub max_retries: u32,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: d_vendor_url(),
            api_key_env: d_vendor_api_key_env(),
            model: d_vendor_model(),
            max_tokens: d_vendor_max_tokens(),
            timeout_ms: d_vendor_timeout_ms(),
            max_retries: d_vendor_max_retries(),
        }
    }
}

impl VendorConfig {
    /// Resolves the configured environment variable to an API key. `None`
    /// if unset or empty, in which case Gate 2b auto-passes.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatesConfig {
    #[serde(default = "d_gate2a_threshold")]
    pub gate2a_confidence_threshold: f64,
    #[serde(default = "d_personal_info_keywords")]
    pub personal_info_keywords: Vec<String>,
}

impl Default for GatesConfig {
    fn default() -> Self {
        Self {
            gate2a_confidence_threshold: d_gate2a_threshold(),
            personal_info_keywords: d_personal_info_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "d_storage_path")]
    pub base_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: d_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_notify_command")]
    pub command: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: d_true(),
            command: d_notify_command(),
        }
    }
}

fn d_port() -> u16 {
    10003
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_max_concurrent_requests() -> usize {
    64
}
fn d_llm_sidecar_url() -> String {
    "http://127.0.0.1:10002".into()
}
fn d_timeout_ms() -> u64 {
    30_000
}
fn d_gate_user_id() -> String {
    "dad".into()
}
fn d_vendor_url() -> String {
    "https://api.anthropic.com".into()
}
fn d_vendor_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn d_vendor_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn d_vendor_max_tokens() -> u32 {
    256
}
fn d_vendor_timeout_ms() -> u64 {
    15_000
}
fn d_vendor_max_retries() -> u32 {
    2
}
fn d_gate2a_threshold() -> f64 {
    0.80
}
fn d_personal_info_keywords() -> Vec<String> {
    vec![
        "ma fille".into(),
        "mon fils".into(),
        "s'appelle".into(),
        "anniversaire".into(),
        "numero de telephone".into(),
        "adresse".into(),
        "mot de passe".into(),
    ]
}
fn d_storage_path() -> String {
    "./data/learning".into()
}
fn d_true() -> bool {
    true
}
fn d_notify_command() -> String {
    "notify-send".into()
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
        if !(self.llm_sidecar.base_url.starts_with("http://")
            || self.llm_sidecar.base_url.starts_with("https://"))
        {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "llm_sidecar.base_url".into(),
                message: "must be an http(s) URL".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.gates.gate2a_confidence_threshold) {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                field: "gates.gate2a_confidence_threshold".into(),
                message: "must be within [0.0, 1.0]".into(),
            });
        }
        if self.gates.personal_info_keywords.is_empty() {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                field: "gates.personal_info_keywords".into(),
                message: "empty keyword list means personal_info is never set".into(),
            });
        }
        if self.vendor.resolve_api_key().is_none() {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                field: "vendor.api_key".into(),
                message: "no external fact-check API key configured, gate2b will auto-pass".into(),
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_only_warnings() {
        let issues = Config::default().validate();
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn out_of_range_threshold_is_error() {
        let mut cfg = Config::default();
        cfg.gates.gate2a_confidence_threshold = 1.5;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.field.contains("threshold")));
    }

    #[test]
    fn non_http_llm_sidecar_url_is_error() {
        let mut cfg = Config::default();
        cfg.llm_sidecar.base_url = "ftp://example.com".into();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.field == "llm_sidecar.base_url"));
    }
}
