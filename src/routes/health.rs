use axum::Json;
use chrono::Utc;
use serde_json::json;

/// Static envelope; `data` is omitted on health per the envelope contract (§6).
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "count": 0,
        "last_updated": Utc::now().to_rfc3339(),
    }))
}
