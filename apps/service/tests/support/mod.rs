//! Local HTTP endpoints and store helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use apimon::config::{DatabaseConfig, ProbeConfig};
use apimon::database::{self, LibsqlStore};
use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tokio::sync::oneshot;

async fn ok() -> impl IntoResponse {
    ([("x-probe", "ok")], "ok")
}

async fn unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance")
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "missing")
}

// /slow/150
async fn slow(Path(ms): Path<u64>) -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "slept"
}

async fn large() -> impl IntoResponse {
    "x".repeat(5000)
}

/// Answers with the request body, echoing the `x-token` header back
async fn echo(headers: HeaderMap, body: String) -> impl IntoResponse {
    let token = headers.get("x-token").and_then(|v| v.to_str().ok()).unwrap_or("").to_string();
    ([(header::HeaderName::from_static("x-token"), token)], body)
}

pub struct TestServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Start the test server on a random local port
pub async fn spawn_test_server() -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/ok", get(ok))
        .route("/unavailable", get(unavailable))
        .route("/missing", get(not_found))
        .route("/slow/:ms", get(slow))
        .route("/large", get(large))
        .route("/echo", post(echo));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    TestServer { base_url, shutdown: Some(shutdown_tx) }
}

/// A local URL nothing listens on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

pub async fn temp_store(dir: &tempfile::TempDir) -> Arc<LibsqlStore> {
    let config = DatabaseConfig { path: dir.path().join("apimon.db"), pool_size: 4 };
    database::connect(&config).await.unwrap()
}

pub fn probe_config(timeout_seconds: u64) -> ProbeConfig {
    ProbeConfig { timeout_seconds, use_system_proxy: false, ..ProbeConfig::default() }
}
