//! Development server with live reload via Server-Sent Events.
//!
//! Serves the output directory from disk and pushes build lifecycle events
//! to connected browsers.

use crate::dev::coordinator::Coordinator;
use crate::dev::{CycleOutcome, DevConfig};
use crate::error::{CliError, Result};
use axum::{
    body::Body,
    extract::State,
    handler::Handler,
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{
        sse::{Event, KeepAlive},
        Html, IntoResponse, Response, Sse,
    },
    routing::{get, post},
    Json, Router,
};
use rust_embed::RustEmbed;
use serde_json::json;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// SSE endpoint for live-reload events.
pub const EVENTS_PATH: &str = "/__siteweave/events";

/// Browser client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__siteweave/reload.js";

/// Largest HTML body that gets the reload script injected.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

#[derive(RustEmbed)]
#[folder = "assets/dev"]
struct DevAssets;

/// Development server.
pub struct DevServer {
    config: DevConfig,
    coordinator: Arc<Coordinator>,
}

impl DevServer {
    pub fn new(config: DevConfig, coordinator: Arc<Coordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.addr;
        TcpListener::bind(addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// Live-reload streams must be closed before `shutdown` resolves, or the
    /// graceful shutdown waits for them forever.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener
            .local_addr()
            .map_err(|e| CliError::Server(e.to_string()))?;
        tracing::debug!(%addr, "dev server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.coordinator))
    }
}

/// Router over a coordinator; public so tests can serve it directly.
pub fn build_router(coordinator: Arc<Coordinator>) -> Router {
    let out_dir = coordinator.state().get_out_dir().to_path_buf();
    let not_found = handle_fallback.with_state(Arc::clone(&coordinator));

    let static_files = ServeDir::new(out_dir)
        .append_index_html_on_directories(true)
        .fallback(not_found);

    Router::new()
        .route(EVENTS_PATH, get(handle_sse))
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .route("/health", get(handle_health))
        .route("/rebuild", post(handle_rebuild))
        .fallback_service(static_files)
        .layer(middleware::map_response(inject_into_html))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(coordinator)
}

/// Handle SSE connections for reload events.
async fn handle_sse(
    State(coordinator): State<Arc<Coordinator>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (id, rx) = coordinator.state().register_client();
    tracing::info!(client = id, "live-reload client connected");

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_reload_script() -> Response {
    embedded("reload-client.js", "application/javascript", StatusCode::OK)
}

async fn handle_health(State(coordinator): State<Arc<Coordinator>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "building": coordinator.is_building(),
        "clients": coordinator.state().client_count(),
        "lastBuild": coordinator.state().get_status().summary(),
    }))
}

/// Manual rebuild: runs a full cycle, or refuses while one is running.
async fn handle_rebuild(State(coordinator): State<Arc<Coordinator>>) -> Response {
    match coordinator.run_cycle().await {
        CycleOutcome::Busy => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "success": false, "message": "build in progress" })),
        )
            .into_response(),
        CycleOutcome::Completed(report) => Json(json!({
            "success": true,
            "message": "rebuild complete",
            "pages": report.results.len(),
            "failed": report.failed(),
            "durationMs": report.duration_ms(),
        }))
        .into_response(),
        CycleOutcome::Failed(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": error })),
        )
            .into_response(),
    }
}

/// Unmatched routes get the root page, or a 404 page before the first build.
async fn handle_fallback(State(coordinator): State<Arc<Coordinator>>) -> Response {
    let index = coordinator.state().get_out_dir().join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(_) => embedded("404.html", "text/html; charset=utf-8", StatusCode::NOT_FOUND),
    }
}

fn embedded(name: &str, content_type: &'static str, status: StatusCode) -> Response {
    match DevAssets::get(name) {
        Some(asset) => (
            status,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            asset.data.into_owned(),
        )
            .into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Missing embedded asset {}", name),
        )
            .into_response(),
    }
}

/// Add the reload client to HTML pages, including the 404 page.
async fn inject_into_html(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    let status = response.status();
    if !is_html || !(status == StatusCode::OK || status == StatusCode::NOT_FOUND) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "cannot buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    // HEAD responses
    if bytes.is_empty() {
        return Response::from_parts(parts, Body::empty());
    }

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Response::from_parts(parts, Body::from(inject_reload_script(&bytes)))
}

/// Inject the reload client script before the closing `</body>` tag.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str("  ");
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(&script_tag);
    result.into_bytes()
}
