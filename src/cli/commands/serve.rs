//! Serve command - walk, watch and expose the registry over HTTP.

use crate::config::Settings;
use crate::server::serve_http;

/// Run the serve command.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    if settings.watch.directories.is_empty() {
        tracing::warn!("[serve] no directories configured; registry will stay empty");
    }
    if settings.watch.extensions.is_empty() {
        tracing::warn!("[serve] no extensions configured; no files will match");
    }

    serve_http(settings).await
}
