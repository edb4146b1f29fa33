//! Turn driver: the append → gateway → append cycle behind both chat endpoints.
//!
//! The caller must hold the session's `TurnPermit`. The permit is kept until the
//! turn has finished, which for streaming replies means until the stream ends or is
//! dropped.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::chat::gateway::{validate_prompt, Gateway, GatewayError, Reply, ResponseMode};
use crate::llm_client::{FragmentStream, LlmError};
use crate::models::message::{Message, Role};
use crate::session::{Session, TurnPermit};

/// Appended to partial output while a streamed reply is still arriving.
pub const IN_PROGRESS_MARKER: &str = "▌";

pub fn render_partial(text: &str) -> String {
    format!("{text}{IN_PROGRESS_MARKER}")
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("no API credential resolved for this session")]
    MissingCredential,

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("model call failed: {0}")]
    Gateway(#[from] LlmError),
}

impl From<GatewayError> for TurnError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::EmptyPrompt => TurnError::EmptyPrompt,
            GatewayError::Llm(e) => TurnError::Gateway(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletedTurn {
    pub user: Message,
    pub assistant: Message,
}

#[derive(Debug)]
pub enum TurnEvent {
    /// `text` is everything received so far, `delta` the newest fragment.
    Fragment { delta: String, text: String },
    Completed { message: Message },
    Failed { error: LlmError },
}

pub type TurnStream = BoxStream<'static, TurnEvent>;

/// Runs a blocking turn. On success the store holds exactly two new messages:
/// the prompt and the unmodified reply. On a provider failure the prompt stays in
/// history and no assistant message is written.
pub async fn run_turn(
    session: &Session,
    gateway: &Gateway,
    _permit: TurnPermit,
    prompt: &str,
) -> Result<CompletedTurn, TurnError> {
    let key = session
        .credential()
        .await
        .ok_or(TurnError::MissingCredential)?;
    let prompt = validate_prompt(prompt)?;

    let user = session.append(Role::User, prompt).await;
    let documents = session.documents().await;

    let text = match gateway
        .ask(&key, prompt, &documents, ResponseMode::Complete)
        .await
    {
        Ok(reply) => reply.into_text().await,
        Err(e) => return Err(e.into()),
    };

    match text {
        Ok(text) => {
            let assistant = session.append(Role::Assistant, text).await;
            info!("Session {} completed a turn", session.id);
            Ok(CompletedTurn { user, assistant })
        }
        Err(e) => {
            warn!("Session {} turn failed: {}", session.id, e);
            Err(TurnError::Gateway(e))
        }
    }
}

/// Starts a streaming turn. Errors before the provider accepts the request are
/// returned directly; later failures arrive as `TurnEvent::Failed`.
///
/// The assistant message is stored only once the stream completes. A stream that
/// fails or is dropped part-way leaves no assistant message behind.
pub async fn start_streaming_turn(
    session: Arc<Session>,
    gateway: &Gateway,
    permit: TurnPermit,
    prompt: &str,
) -> Result<TurnStream, TurnError> {
    let key = session
        .credential()
        .await
        .ok_or(TurnError::MissingCredential)?;
    let prompt = validate_prompt(prompt)?;

    session.append(Role::User, prompt).await;
    let documents = session.documents().await;

    let fragments = match gateway
        .ask(&key, prompt, &documents, ResponseMode::Streaming)
        .await
    {
        Ok(Reply::Streaming(fragments)) => fragments,
        Ok(Reply::Complete(text)) => stream::iter(vec![Ok(text)]).boxed(),
        Err(e) => {
            warn!("Session {} streaming turn rejected: {}", session.id, e);
            return Err(e.into());
        }
    };

    let state = StreamState {
        session,
        fragments,
        text: String::new(),
        permit: Some(permit),
    };

    Ok(stream::unfold(state, next_event).boxed())
}

struct StreamState {
    session: Arc<Session>,
    fragments: FragmentStream,
    text: String,
    /// Released as soon as the turn reaches a terminal event.
    permit: Option<TurnPermit>,
}

async fn next_event(mut state: StreamState) -> Option<(TurnEvent, StreamState)> {
    state.permit.as_ref()?;

    let event = match state.fragments.next().await {
        Some(Ok(delta)) => {
            state.text.push_str(&delta);
            return Some((
                TurnEvent::Fragment {
                    delta,
                    text: state.text.clone(),
                },
                state,
            ));
        }
        Some(Err(error)) => {
            warn!("Session {} stream failed: {}", state.session.id, error);
            TurnEvent::Failed { error }
        }
        None if state.text.is_empty() => TurnEvent::Failed {
            error: LlmError::EmptyContent,
        },
        None => {
            let message = state
                .session
                .append(Role::Assistant, state.text.clone())
                .await;
            info!("Session {} completed a streamed turn", state.session.id);
            TurnEvent::Completed { message }
        }
    };

    state.permit = None;
    Some((event, state))
}
