use std::path::PathBuf;

use clap::Parser;
use jarvis_learning_sidecar::config::{Config, Severity};
use jarvis_learning_sidecar::http;
use jarvis_learning_sidecar::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "learning-sidecar")]
struct Cli {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jarvis_domain::logging::init_tracing("learning-sidecar");

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

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "learning sidecar listening");

    let app = http::router(state);
    axum::serve(listener, app).await?;
    Ok(())
}
