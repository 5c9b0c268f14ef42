use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::cache::CacheStore;
use crate::error::AppError;

use super::CredentialService;

const API_KEY_HEADER: &str = "x-api-key";

/// Validates the `X-API-KEY` header against the credential service.
///
/// A configured `legacy_api_key` bypasses the credential lookup entirely
/// when it matches exactly — this keeps a single static operator key
/// working even if the origin-backed credential set is empty or
/// unreachable, at the cost of that one key never expiring or being
/// revocable through the credential endpoints (§9 design note).
pub async fn require_api_key<C: CacheStore + 'static>(
    State(service): State<Arc<CredentialService<C>>>,
    State(legacy_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::MissingCredential)?;

    if let Some(legacy) = &legacy_api_key
        && legacy == key
    {
        return Ok(next.run(request).await);
    }

    if service.validate(key).await? {
        Ok(next.run(request).await)
    } else {
        Err(AppError::InvalidCredential)
    }
}
