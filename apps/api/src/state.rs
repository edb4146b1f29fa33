use std::sync::Arc;

use uuid::Uuid;

use crate::chat::gateway::Gateway;
use crate::config::Config;
use crate::credentials::SecretStore;
use crate::documents::stager::DocumentStager;
use crate::errors::AppError;
use crate::session::{Session, SessionRegistry};

/// Shared application state injected into all route handlers via Axum extractors.
/// Per-user state lives in `Session`s, never here.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub gateway: Arc<Gateway>,
    pub stager: Arc<DocumentStager>,
    /// Server-side secret store consulted when a session is created.
    pub secrets: Arc<dyn SecretStore>,
    pub config: Config,
}

impl AppState {
    pub async fn session(&self, id: Uuid) -> Result<Arc<Session>, AppError> {
        self.sessions
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }
}
