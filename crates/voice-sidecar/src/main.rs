use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use jarvis_voice_sidecar::config::{Config, Severity};
use jarvis_voice_sidecar::http;
use jarvis_voice_sidecar::state::AppState;
use jarvis_voice_sidecar::transcriber::{NullTranscriber, Transcriber};

/// Known user identities the voice sidecar enrolls fingerprints for.
const KNOWN_USERS: [&str; 4] = ["dad", "mom", "teen", "child"];

#[derive(Parser, Debug)]
#[command(name = "voice-sidecar")]
struct Cli {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jarvis_domain::logging::init_tracing("voice-sidecar");

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        tracing::warn!(path = %cli.config.display(), "config file not found, using defaults");
        Config::default()
    };

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            Severity::Warning => tracing::warn!("config: {issue}"),
            Severity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == Severity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == Severity::Error).count()
        );
    }

    let known_users: Vec<String> = KNOWN_USERS.iter().map(|s| s.to_string()).collect();
    let transcriber: Arc<dyn Transcriber> = Arc::new(NullTranscriber);
    let state = AppState::new(config.clone(), &known_users, transcriber)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "voice sidecar listening");

    let app = http::router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
