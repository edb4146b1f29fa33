//! Axum route handlers for chat turns.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::gateway::Gateway;
use crate::chat::turn::{self, render_partial, TurnError, TurnEvent};
use crate::errors::AppError;
use crate::models::message::Message;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub user: Message,
    pub assistant: Message,
}

#[derive(Debug, Serialize)]
struct FragmentPayload<'a> {
    delta: &'a str,
    text: &'a str,
    /// Partial text with the in-progress marker, ready to render.
    display: String,
}

fn turn_error(gateway: &Gateway, err: TurnError) -> AppError {
    match err {
        TurnError::MissingCredential => AppError::Configuration,
        TurnError::EmptyPrompt => AppError::Validation("prompt cannot be empty".to_string()),
        TurnError::Gateway(e) => AppError::Gateway(gateway.notice(&e)),
    }
}

/// POST /api/v1/sessions/:id/messages
///
/// Blocking turn: returns once the full reply has been stored.
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let session = state.session(id).await?;
    let permit = session.begin_turn()?;

    let completed = turn::run_turn(&session, &state.gateway, permit, &request.prompt)
        .await
        .map_err(|e| turn_error(&state.gateway, e))?;

    Ok(Json(AskResponse {
        user: completed.user,
        assistant: completed.assistant,
    }))
}

/// POST /api/v1/sessions/:id/messages/stream
///
/// Server-Sent Events: `fragment` per chunk, then exactly one of `done` or `error`.
pub async fn handle_ask_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = state.session(id).await?;
    let permit = session.begin_turn()?;

    let events = turn::start_streaming_turn(session, &state.gateway, permit, &request.prompt)
        .await
        .map_err(|e| turn_error(&state.gateway, e))?;

    let gateway = state.gateway.clone();
    let sse = events.map(move |event| Ok::<_, Infallible>(to_sse_event(&gateway, event)));

    Ok(Sse::new(sse).keep_alive(KeepAlive::default()))
}

fn to_sse_event(gateway: &Gateway, event: TurnEvent) -> Event {
    match event {
        TurnEvent::Fragment { delta, text } => {
            let payload = FragmentPayload {
                delta: &delta,
                text: &text,
                display: render_partial(&text),
            };
            Event::default()
                .event("fragment")
                .data(serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string()))
        }
        TurnEvent::Completed { message } => Event::default().event("done").data(
            serde_json::to_string(&serde_json::json!({ "message": message }))
                .unwrap_or_else(|_| "{}".to_string()),
        ),
        TurnEvent::Failed { error } => {
            let notice = gateway.notice(&error);
            Event::default().event("error").data(
                serde_json::to_string(&serde_json::json!({ "notice": notice }))
                    .unwrap_or_else(|_| "{}".to_string()),
            )
        }
    }
}
