use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber. Call once at process startup,
/// before the server starts accepting connections. `RUST_LOG` selects the
/// filter (defaults to `info` when unset).
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .flatten_event(true)
        .init();
    tracing::info!(service = service_name, "tracing initialized");
}
