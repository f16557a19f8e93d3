pub mod config;
pub mod models;
pub mod pipeline;
pub mod region; // Free-text region → canonical province
pub mod store; // Key-value persistence port
pub mod workspace; // History + knowledge collections, search, dashboard

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Honors `RUST_LOG`; falls back to `config::default_log_filter()`. Safe to
/// call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::debug!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
}
