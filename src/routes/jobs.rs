use std::collections::HashMap;

use axum::Json;
use axum::extract::{Query, State};
use serde_json::json;

use crate::error::AppError;
use crate::filter::JobFilter;
use crate::state::AppState;

fn envelope<T: serde::Serialize>(count: usize, data: &[T]) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "count": count,
        "last_updated": chrono::Utc::now().to_rfc3339(),
        "data": data,
    }))
}

/// When `upwork_url` is present, its translated params are merged under
/// the directly-supplied ones before parsing — translate, then merge,
/// then parse, per §4.D/§4.G.
fn resolve_params(mut params: HashMap<String, String>) -> Result<HashMap<String, String>, AppError> {
    if let Some(upwork_url) = params.remove("upwork_url") {
        let translated = crate::upwork::translate(&upwork_url)
            .map_err(|e| AppError::malformed("upwork_url", e.to_string()))?;
        params = crate::upwork::merge_into(translated, &params);
    }
    Ok(params)
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let params = resolve_params(params)?;
    let filter = JobFilter::parse(&params)?;
    let result = state.pipeline.query_jobs(&filter).await?;
    Ok(envelope(result.count, &result.data))
}

pub async fn list_job_list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let params = resolve_params(params)?;
    let filter = JobFilter::parse(&params)?;
    let result = state.pipeline.query_job_list(&filter).await?;
    Ok(envelope(result.count, &result.data))
}
