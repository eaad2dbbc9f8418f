//! HTTP façade over the registry.
//!
//! Routes:
//! - `GET /registry.json` - every registered entry as a JSON array
//! - `GET /files/{*path}` - content of the entry whose URL matches the request
//! - `GET /health` - liveness check
//!
//! All routes carry permissive CORS headers so browser tools on other origins
//! can read them.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Request, State};
use axum::http::{Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;

use super::error::ServeError;
use crate::config::Settings;
use crate::registry::{Registrar, Registry, UrlBuilder};
use crate::watcher::ChangeWatcher;

/// Shared per-request state. Handlers hold no other state.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<Registry>,
    urls: UrlBuilder,
}

/// Build the router for a registry.
///
/// `urls` must be the same builder the registrar used, so request paths
/// resolve to the URLs stored in entries.
pub fn router(registry: Arc<Registry>, urls: UrlBuilder) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/registry.json", get(registry_json))
        .route("/files/{*path}", get(serve_file))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(AppState { registry, urls })
}

async fn health_check() -> &'static str {
    "OK"
}

async fn registry_json(State(state): State<AppState>) -> Result<Response, ServeError> {
    let entries = state.registry.snapshot();
    let body = serde_json::to_vec(&entries)?;

    crate::debug_event!("http", "registry", "{} entries", entries.len());
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn serve_file(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    request: Request,
) -> Result<Response, ServeError> {
    // A path that does not decode to UTF-8 cannot match any registered URL.
    let Ok(Path(path)) = path else {
        return Err(ServeError::NotFound(request.uri().path().to_string()));
    };
    let url = state.urls.request_url(&format!("/files/{path}"));

    // Lock is released before any file I/O.
    let entry = state
        .registry
        .find_by_url(&url)
        .ok_or(ServeError::NotFound(url))?;

    match ServeFile::new(&entry.absolute_path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}

/// Walk, watch and serve until Ctrl-C.
///
/// The initial walk completes before the listener opens. Failing to create
/// the notification backend is fatal; failures on individual roots are not.
pub async fn serve_http(settings: Settings) -> anyhow::Result<()> {
    let registrar = Arc::new(Registrar::from_settings(&settings));

    let walker = registrar.clone();
    let report = tokio::task::spawn_blocking(move || walker.register_all())
        .await
        .context("initial walk panicked")?;

    crate::log_event!(
        "http",
        "registry ready",
        "{} files from {} roots ({} failed)",
        report.registered,
        report.completed.len(),
        report.failures.len()
    );

    let ct = CancellationToken::new();

    if settings.watch.enabled {
        let mut watcher = ChangeWatcher::new(registrar.clone(), settings.watch.sync_registry)
            .context("failed to create file watcher")?;
        let watched = watcher.watch_all_roots();
        crate::log_event!("watcher", "watching", "{watched} roots");

        let watcher_ct = ct.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = watcher.run() => {}
                _ = watcher_ct.cancelled() => {
                    crate::log_event!("watcher", "stopped");
                }
            }
        });
    }

    let app = router(registrar.registry().clone(), registrar.urls().clone());

    let addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    crate::log_event!("http", "listening", "http://{addr}");
    crate::log_event!("http", "registry", "{}/registry.json", registrar.urls().base());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(ct.clone()))
        .await
        .context("http server failed")?;

    ct.cancel();
    crate::log_event!("http", "shut down");
    Ok(())
}

/// Resolves on Ctrl-C and cancels background tasks.
async fn shutdown_signal(ct: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("[http] cannot listen for ctrl+c: {e}");
        std::future::pending::<()>().await;
    }
    crate::log_event!("http", "shutdown requested");
    ct.cancel();
}
