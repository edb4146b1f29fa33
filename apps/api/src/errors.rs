use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::chat::notice::{FailureKind, Notice};
use crate::session::TurnBusy;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A turn is already in progress")]
    TurnInProgress,

    /// Missing credential. Blocks request-issuing operations until resolved.
    #[error("Configuration error")]
    Configuration,

    /// A classified model-provider failure, already translated for the user.
    #[error("Model gateway error: {}", .0.message)]
    Gateway(Notice),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TurnBusy> for AppError {
    fn from(_: TurnBusy) -> Self {
        AppError::TurnInProgress
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, notice) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", Err(msg)),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", Err(msg)),
            AppError::TurnInProgress => (
                StatusCode::CONFLICT,
                "TURN_IN_PROGRESS",
                Err("上一個問題仍在處理中，請稍候。".to_string()),
            ),
            AppError::Configuration => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CONFIGURATION_ERROR",
                Ok(Notice::configuration()),
            ),
            AppError::Gateway(notice) => {
                let (status, code) = match notice.kind {
                    FailureKind::RateLimit => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
                    FailureKind::Authentication => {
                        (StatusCode::BAD_GATEWAY, "AUTHENTICATION_ERROR")
                    }
                    _ => (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR"),
                };
                (status, code, Ok(notice))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    Err("An internal server error occurred".to_string()),
                )
            }
        };

        // Notices carry their kind and retry guidance alongside the message.
        let body = match notice {
            Ok(notice) => {
                let mut error = serde_json::to_value(&notice).unwrap_or_else(|_| json!({}));
                error["code"] = json!(code);
                json!({ "error": error })
            }
            Err(message) => json!({
                "error": {
                    "code": code,
                    "message": message
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}
