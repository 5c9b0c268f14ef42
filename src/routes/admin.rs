use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::cache::{CacheStore, CacheStoreExt, keys};
use crate::error::AppError;
use crate::state::AppState;

fn envelope(count: usize, data: Option<serde_json::Value>) -> serde_json::Value {
    let mut body = json!({
        "success": true,
        "count": count,
        "last_updated": Utc::now().to_rfc3339(),
    });
    if let Some(data) = data
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("data".to_string(), data);
    }
    body
}

#[derive(Debug, Deserialize)]
pub struct RefreshCacheRequest {
    pub key: String,
}

/// `POST /api-keys/refresh-cache` — drops the cached verdict for one key,
/// forcing the next `validate` to hit the origin store (§4.B `refresh`).
pub async fn refresh_cache(
    State(state): State<AppState>,
    Json(body): Json<RefreshCacheRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.credentials.refresh(&body.key).await?;
    Ok(Json(envelope(0, None)))
}

/// `DELETE /api-keys/:key/cache` — same invalidation, keyed by path segment
/// rather than a request body.
pub async fn clear_key_cache(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.credentials.refresh(&key).await?;
    Ok(Json(envelope(0, None)))
}

/// `GET /cache/stats` — hit/miss counters maintained by the query pipeline
/// (§4.G step 2).
pub async fn cache_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let hits: i64 = state
        .cache
        .get(keys::STATS_HITS)
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?
        .unwrap_or(0);
    let misses: i64 = state
        .cache
        .get(keys::STATS_MISSES)
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?
        .unwrap_or(0);
    Ok(Json(envelope(2, Some(json!({ "hits": hits, "misses": misses })))))
}

/// `DELETE /cache/clear` — scans the response-cache prefix and deletes
/// every entry found, returning the count removed. Idempotent: a second
/// call with nothing left to delete returns `count: 0` (§8).
pub async fn cache_clear(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let found = state
        .cache
        .scan_prefix(keys::RESPONSE_PREFIX)
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;
    let mut count = 0;
    for key in found {
        if state
            .cache
            .delete(&key)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?
        {
            count += 1;
        }
    }
    Ok(Json(envelope(count, None)))
}

/// `GET /swagger/*` — OpenAPI generation lives outside this core (§1); this
/// stub keeps the route present without pretending to serve real docs.
pub async fn swagger() -> Json<serde_json::Value> {
    Json(envelope(
        0,
        Some(json!({
            "message": "API documentation is published separately from this service."
        })),
    ))
}
