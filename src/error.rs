use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;

/// One entry in a 400 response's `details` array: which field failed and why.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldDiagnostic {
    pub field: String,
    pub message: String,
}

impl FieldDiagnostic {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("malformed query")]
    Malformed(Vec<FieldDiagnostic>),

    #[error("missing X-API-KEY header")]
    MissingCredential,

    #[error("invalid or expired X-API-KEY")]
    InvalidCredential,

    #[error("cache error: {0}")]
    Cache(String),

    #[error("origin store error: {0}")]
    Origin(String),

    #[error("query cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed(vec![FieldDiagnostic::new(field, message)])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let last_updated = Utc::now().to_rfc3339();
        let (status, message, details) = match &self {
            AppError::Malformed(details) => (
                StatusCode::BAD_REQUEST,
                "Malformed query".to_string(),
                Some(details.clone()),
            ),
            AppError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "Missing X-API-KEY header".to_string(),
                None,
            ),
            AppError::InvalidCredential => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired X-API-KEY".to_string(),
                None,
            ),
            AppError::Cache(msg) => {
                tracing::warn!("cache transport failure: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Origin(msg) => {
                tracing::error!("origin store error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Cancelled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "query cancelled".to_string(),
                None,
            ),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "success": false,
            "count": 0,
            "last_updated": last_updated,
            "message": message,
        });
        if let Some(details) = details
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("details".to_string(), json!(details));
        }

        (status, Json(body)).into_response()
    }
}
