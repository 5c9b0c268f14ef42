pub mod admin;
pub mod health;
pub mod jobs;

use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use axum::Json;
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

use crate::cache::RedisCache;
use crate::credential::middleware::require_api_key;
use crate::state::AppState;

/// Assembles the HTTP surface (§4.H). Middleware is layered so that a
/// request passes through recovery, then access logging, then auth, before
/// reaching a handler — the last `.layer()` call is the outermost, so they
/// are added bottom-up here.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/jobs", get(jobs::list_jobs))
        .route("/job-list", get(jobs::list_job_list))
        .route("/api-keys/refresh-cache", post(admin::refresh_cache))
        .route("/api-keys/{key}/cache", delete(admin::clear_key_cache))
        .route("/cache/stats", get(admin::cache_stats))
        .route("/cache/clear", delete(admin::cache_clear))
        .route("/swagger/{*path}", get(admin::swagger))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key::<RedisCache>,
        ))
        .layer(middleware::from_fn(access_log))
        .layer(middleware::from_fn(normalize_error_envelope))
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

/// Logs method, URI, status, duration, and client IP for every request
/// (§4.H middleware order). Requires the app to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
async fn access_log(ConnectInfo(addr): ConnectInfo<SocketAddr>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        client_ip = %addr.ip(),
        "request"
    );
    response
}

/// Unmatched routes and unsupported methods on matched ones fall through
/// axum's router with a bare status and no body; this rewrites those into
/// the uniform envelope (§6) without touching responses `AppError` already
/// formatted (400/401/5xx keep their own envelope).
async fn normalize_error_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if status != StatusCode::NOT_FOUND && status != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let message = if status == StatusCode::NOT_FOUND {
        "route not found"
    } else {
        "method not allowed"
    };
    (
        status,
        Json(json!({
            "success": false,
            "count": 0,
            "last_updated": Utc::now().to_rfc3339(),
            "message": message,
        })),
    )
        .into_response()
}

/// Recovery middleware (§4.H, §5): a panic inside a handler is caught here
/// rather than tearing down the connection, and reported through the same
/// envelope as any other internal error.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("panic in request handler: {message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "count": 0,
            "last_updated": Utc::now().to_rfc3339(),
            "message": "Internal server error",
        })),
    )
        .into_response()
}
