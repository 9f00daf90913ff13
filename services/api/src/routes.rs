use crate::infra::{AppState, LiveIntakeService};
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router};
use lead_intake::intake::intake_router;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

const INDEX_FILE: &str = "index.html";

pub(crate) fn with_service_routes(service: Arc<LiveIntakeService>) -> Router {
    intake_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .fallback(frontend_fallback)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Serves the built form from the static directory, answering unknown paths
/// with its index page so client-side routes resolve. Unknown API paths stay 404.
pub(crate) async fn frontend_fallback(
    Extension(state): Extension<AppState>,
    request: Request,
) -> Response {
    let path = request.uri().path();
    if path == "/api" || path.starts_with("/api/") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "endpoint not found" })),
        )
            .into_response();
    }

    let index = state.static_dir.join(INDEX_FILE);
    if !index.is_file() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "frontend not available" })),
        )
            .into_response();
    }

    let assets = ServeDir::new(state.static_dir.as_path()).fallback(ServeFile::new(index));
    match assets.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
