//! clinic-mirror HTTP API
//!
//! Axum-based HTTP server that exposes the mirrored episode list, episode
//! details and panel images to the front-end client.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET /api/docs: episode list, oldest first
//! - GET /api/docs/:doc_id: episode detail (cached)
//! - GET /api/docs/:doc_id/images/:image_index: panel image (cached)
//! - GET /health: health check with DB status
//! - GET /version: server version info
//!
//! A missing or unreachable episode is not an error: it answers 200 with the
//! empty-shaped body. Only store failures produce a 500.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use clinic_core::ClinicConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::mirror::Mirror;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub mirror: Mirror,
    pub config: ClinicConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/api/docs", get(docs_handler))
        .route("/api/docs/:doc_id", get(doc_handler))
        .route("/api/docs/:doc_id/images/:image_index", get(image_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    mirror: Mirror,
    config: ClinicConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState { mirror, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("clinic-mirror HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner episode list: scrapes the index pages on every call.
pub async fn docs_inner(mirror: &Mirror) -> (StatusCode, serde_json::Value) {
    let episodes = mirror.episodes().await;
    (StatusCode::OK, serde_json::json!(episodes))
}

/// Inner episode detail: read-through the cache store.
pub async fn doc_inner(mirror: &Mirror, doc_id: u64) -> (StatusCode, serde_json::Value) {
    match mirror.episode_detail(doc_id).await {
        Ok(detail) => (StatusCode::OK, serde_json::json!(detail)),
        Err(e) => {
            tracing::error!(doc_id, error = %e, "Episode detail lookup failed");
            internal_error(e)
        }
    }
}

/// Inner image: read-through the cache store; empty bytes when not found.
pub async fn image_inner(
    mirror: &Mirror,
    doc_id: u64,
    image_index: u32,
) -> std::result::Result<Bytes, (StatusCode, serde_json::Value)> {
    mirror
        .episode_image(doc_id, image_index)
        .await
        .map_err(|e| {
            tracing::error!(doc_id, image_index, error = %e, "Image lookup failed");
            internal_error(e)
        })
}

/// Inner health check: queries DB and returns (status_code, json_body).
pub async fn health_inner(mirror: &Mirror) -> (StatusCode, serde_json::Value) {
    let store = mirror.store();
    match clinic_core::db::health_check(store.pool()).await {
        Ok(version) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "sqlite": version,
                "read_only": store.is_read_only(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "clinic-mirror",
    })
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn docs_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = docs_inner(&state.mirror).await;
    (status, Json(body))
}

pub async fn doc_handler(
    State(state): State<Arc<HttpState>>,
    Path(doc_id): Path<u64>,
) -> impl IntoResponse {
    let (status, body) = doc_inner(&state.mirror, doc_id).await;
    (status, Json(body))
}

pub async fn image_handler(
    State(state): State<Arc<HttpState>>,
    Path((doc_id, image_index)): Path<(u64, u32)>,
) -> Response {
    match image_inner(&state.mirror, doc_id, image_index).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.mirror).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Helpers
// ============================================================================

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({
            "error": e.to_string(),
            "status": "error",
        }),
    )
}

// ============================================================================
// Unit Tests, call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_core::{db, CacheStore, HttpFetcher, SiteConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn make_mirror(server: &MockServer) -> Mirror {
        let site = SiteConfig::with_base_url(server.uri());
        let fetcher = HttpFetcher::new(&site).expect("client");
        let store = CacheStore::new(db::memory_pool().await.expect("pool"), false);
        store.migrate().await.expect("migrate");
        Mirror::new(Arc::new(fetcher), site, store)
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["service"], "clinic-mirror");
    }

    #[test]
    fn test_internal_error_shape() {
        let (status, body) = internal_error("disk full");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "disk full");
    }

    #[tokio::test]
    async fn test_doc_inner_missing_episode_is_empty_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let mirror = make_mirror(&server).await;

        let (status, body) = doc_inner(&mirror, 1000001).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"datetime": "", "images": 0, "message": ""}));
    }

    #[tokio::test]
    async fn test_image_inner_index_zero_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .expect(0)
            .mount(&server)
            .await;
        let mirror = make_mirror(&server).await;

        let bytes = image_inner(&mirror, 1050123, 0).await.expect("ok");
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_image_inner_resolves_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/dcw/docs/1050/123/02.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"panel".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        let mirror = make_mirror(&server).await;

        let first = image_inner(&mirror, 1050123, 2).await.expect("ok");
        let second = image_inner(&mirror, 1050123, 2).await.expect("ok");
        assert_eq!(&first[..], b"panel");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_health_inner_ok() {
        let server = MockServer::start().await;
        let mirror = make_mirror(&server).await;

        let (status, body) = health_inner(&mirror).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["sqlite"].is_string());
        assert_eq!(body["read_only"], false);
    }
}
