//! Integration tests for the development server.
//!
//! Each test serves a real router on an ephemeral port and talks to it over
//! HTTP.

use siteweave_cli::build::Orchestrator;
use siteweave_cli::config::{ApiConfig, PageDescriptor};
use siteweave_cli::dev::{
    Coordinator, DebounceTiming, DevConfig, DevServer, DevServerState, WatchTargets,
};
use siteweave_cli::fetch::Fetcher;
use siteweave_cli::page::PageBuilder;
use siteweave_cli::render::TemplateEngine;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    url: String,
    coordinator: Arc<Coordinator>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<siteweave_cli::Result<()>>,
}

impl Running {
    async fn shutdown(mut self) {
        self.coordinator.shutdown();
        self.coordinator.state().close_all_clients();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server stops")
            .unwrap()
            .unwrap();
    }
}

async fn start(root: &Path) -> Running {
    fs::create_dir_all(root.join("templates")).unwrap();
    fs::write(
        root.join("templates/index.html"),
        "<html><body><h1>Home</h1></body></html>",
    )
    .unwrap();

    let builder = PageBuilder::new(
        root.join("templates"),
        root.join("dist"),
        Fetcher::new(&ApiConfig::default()).unwrap(),
        TemplateEngine::new(),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        vec![PageDescriptor::new("index.html", "index.html")],
        builder,
        root.join("templates"),
        root.join("assets"),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = DevConfig {
        addr,
        open: false,
        timing: DebounceTiming::from_millis(50, 0),
        reload_delay: Duration::from_millis(20),
        reattach_delay: Duration::from_millis(100),
    };
    let targets = WatchTargets {
        template_dir: root.join("templates"),
        assets_dir: root.join("assets"),
        config_file: None,
        output_dir: root.join("dist"),
        ignore: vec![],
    };
    let state = Arc::new(DevServerState::new(root.join("dist")));
    let (coordinator, _requests) = Coordinator::new(orchestrator, state, config.clone(), targets);

    let (stop, stopped) = oneshot::channel::<()>();
    let server = DevServer::new(config, Arc::clone(&coordinator));
    let handle = tokio::spawn(server.serve(listener, async {
        let _ = stopped.await;
    }));

    Running {
        url: format!("http://{}", addr),
        coordinator,
        stop: Some(stop),
        handle,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp = TempDir::new().unwrap();
    let server = start(temp.path()).await;

    let body: serde_json::Value = reqwest::get(format!("{}/health", server.url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["building"], false);
    assert_eq!(body["clients"], 0);
    assert!(body["timestamp"].as_str().unwrap().contains('T'));
    assert_eq!(body["lastBuild"]["state"], "not-started");

    server.shutdown().await;
}

#[tokio::test]
async fn test_404_page_before_first_build() {
    let temp = TempDir::new().unwrap();
    let server = start(temp.path()).await;

    let response = reqwest::get(format!("{}/anything", server.url)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let html = response.text().await.unwrap();
    assert!(html.contains("404"));
    assert!(html.contains("/__siteweave/reload.js"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_manual_rebuild_then_serve_with_reload_script() {
    let temp = TempDir::new().unwrap();
    let server = start(temp.path()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rebuild", server.url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["pages"], 1);
    assert_eq!(body["failed"], 0);

    let health: serde_json::Value = client
        .get(format!("{}/health", server.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["lastBuild"]["state"], "complete");
    assert_eq!(health["lastBuild"]["pages"], 1);

    let html = client
        .get(format!("{}/", server.url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("<h1>Home</h1>"));
    let script = html.find(r#"<script src="/__siteweave/reload.js"></script>"#).unwrap();
    assert!(script < html.find("</body>").unwrap());

    // Unknown routes fall back to the root page
    let fallback = client
        .get(format!("{}/some/client/route", server.url))
        .send()
        .await
        .unwrap();
    assert_eq!(fallback.status(), reqwest::StatusCode::OK);
    assert!(fallback.text().await.unwrap().contains("<h1>Home</h1>"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_static_assets_are_not_modified() {
    let temp = TempDir::new().unwrap();
    let server = start(temp.path()).await;
    fs::create_dir_all(temp.path().join("dist")).unwrap();
    fs::write(temp.path().join("dist/site.css"), "body{}").unwrap();

    let css = reqwest::get(format!("{}/site.css", server.url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(css, "body{}");

    let script = reqwest::get(format!("{}/__siteweave/reload.js", server.url))
        .await
        .unwrap();
    assert!(script.headers()["content-type"]
        .to_str()
        .unwrap()
        .contains("javascript"));
    assert!(script.text().await.unwrap().contains("EventSource"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_sse_receives_build_lifecycle() {
    let temp = TempDir::new().unwrap();
    let server = start(temp.path()).await;
    let client = reqwest::Client::new();

    let mut events = client
        .get(format!("{}/__siteweave/events", server.url))
        .send()
        .await
        .unwrap();
    assert!(events.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut seen = String::new();
    let first = tokio::time::timeout(Duration::from_secs(5), events.chunk())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    seen.push_str(&String::from_utf8_lossy(&first));
    assert!(seen.contains(r#"data: {"type":"connected"}"#));

    client
        .post(format!("{}/rebuild", server.url))
        .send()
        .await
        .unwrap();

    while !seen.contains(r#"{"type":"reload"}"#) {
        let chunk = tokio::time::timeout(Duration::from_secs(5), events.chunk())
            .await
            .expect("event before timeout")
            .unwrap()
            .expect("stream still open");
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }

    let start = seen.find("build-start").unwrap();
    let complete = seen.find("build-complete").unwrap();
    let reload = seen.find(r#""reload""#).unwrap();
    assert!(start < complete && complete < reload);
    assert!(!seen.contains("build-error"));

    // Closing clients ends the stream, so shutdown does not hang on it
    server.shutdown().await;
    let rest = tokio::time::timeout(Duration::from_secs(5), async {
        while let Ok(Some(_)) = events.chunk().await {}
    })
    .await;
    assert!(rest.is_ok());
}
