use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::chat::notice::Notice;
use crate::credentials::{self, ApiKey};
use crate::errors::AppError;
use crate::models::message::Message;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Interactively supplied key; takes precedence over the secret store.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub credential_ready: bool,
    /// Present when no credential could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Debug, Deserialize)]
pub struct SetCredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    // A request without a JSON body asks for a session backed by the secret store.
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => CreateSessionRequest::default(),
        Err(rejection) => {
            return Err(AppError::Validation(format!(
                "invalid session request: {}",
                rejection.body_text()
            )))
        }
    };
    let key = match credentials::resolve(state.secrets.as_ref(), request.api_key.as_deref()) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("Session started without credential: {e}");
            None
        }
    };

    let credential_ready = key.is_some();
    let session = state.sessions.create(key).await;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id,
            created_at: session.created_at,
            credential_ready,
            notice: (!credential_ready).then(Notice::configuration),
        }),
    ))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.end(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// PUT /api/v1/sessions/:id/credential
pub async fn handle_set_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetCredentialRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.session(id).await?;
    let key = ApiKey::parse(&req.api_key)
        .ok_or_else(|| AppError::Validation("api_key cannot be empty".to_string()))?;
    session.set_credential(key).await;

    Ok(Json(SessionResponse {
        session_id: session.id,
        created_at: session.created_at,
        credential_ready: true,
        notice: None,
    }))
}

/// GET /api/v1/sessions/:id/messages
pub async fn handle_list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, AppError> {
    let session = state.session(id).await?;
    Ok(Json(MessagesResponse {
        messages: session.messages().await,
    }))
}

/// DELETE /api/v1/sessions/:id/messages
///
/// Refused with 409 while a turn is in flight.
pub async fn handle_clear_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let session = state.session(id).await?;
    let _permit = session.begin_turn()?;
    session.clear_history().await;
    Ok(StatusCode::NO_CONTENT)
}
