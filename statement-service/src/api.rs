//! HTTP API for the statement service.
//!
//! This module provides the REST API endpoints for:
//! - Batch upload and artifact generation
//! - Artifact downloads
//! - Batch inspection
//! - Health and metrics monitoring

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequestParts, State},
    http::{StatusCode, header, request::Parts},
    response::IntoResponse,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{I18nError, ServiceError};
use crate::service::StatementService;

pub mod artifacts;
pub mod batches;
pub mod generate;
pub mod upload;
use artifacts::artifact_handler;
use batches::{batch_records_handler, get_batch_handler};
use generate::generate_handler;
use upload::upload_handler;

/// Application state
pub struct AppState {
    pub service: Arc<StatementService>,
    pub start_time: Instant,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create an i18n-aware error from a service error
    pub fn i18n_error(&self, error: ServiceError, locale: &str) -> I18nError {
        I18nError::new(error, self.service.i18n.clone(), locale)
    }
}

/// Locale negotiated from the request's `Accept-Language` header
pub struct RequestLocale(pub String);

impl FromRequestParts<Arc<AppState>> for RequestLocale {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let accept_language = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        Ok(Self(state.service.i18n.negotiate(accept_language)))
    }
}

/// Build the API router
pub fn router(service: Arc<StatementService>, metrics: Option<PrometheusHandle>) -> Router {
    let max_body_size = service.config.limits.max_upload_body_bytes();
    let static_dir = service.config.server.static_dir.clone();

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/generate", get(generate_handler))
        .route("/artifacts/{batch_id}/{file_name}", get(artifact_handler))
        .route("/batches/{batch_id}", get(get_batch_handler))
        .route("/batches/{batch_id}/records", get(batch_records_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    // Built frontend, if any, for everything else
    if let Some(dir) = static_dir {
        info!(path = %dir.display(), "Serving static files");
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).not_found_service(index));
    }

    app.layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(
    State(state): State<Arc<AppState>>,
    RequestLocale(locale): RequestLocale,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: state.service.i18n.get(&locale, "health-status-healthy", None),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::service::testing::{test_service, test_service_with};
    use axum::body::Body;
    use axum::http::Request;

    #[tokio::test]
    async fn test_health() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let response = fetch(&app, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "El servicio está funcionando");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_follows_accept_language() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let request = Request::get("/health")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .body(Body::empty())
            .unwrap();
        let json = body_json(send(&app, request).await).await;
        assert_eq!(json["status"], "Service is healthy");
    }

    #[tokio::test]
    async fn test_metrics_without_recorder_is_empty() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let response = fetch(&app, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_static_dir_falls_back_to_index() {
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("index.html"), "<html>app</html>").unwrap();
        let path = static_dir.path().to_path_buf();

        let (_dir, service) = test_service_with(|config| config.server.static_dir = Some(path));
        let app = router(service, None);

        let response = fetch(&app, "/some/client/route").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"<html>app</html>");
    }

    #[tokio::test]
    async fn test_unknown_route_without_static_dir() {
        let (_dir, service) = test_service();
        let app = router(service, None);

        let response = fetch(&app, "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
