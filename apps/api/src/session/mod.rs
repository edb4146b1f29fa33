//! Session-scoped context: conversation history, staged documents and the resolved
//! credential for one interactive user. Nothing here is shared between sessions.

pub mod handlers;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::credentials::ApiKey;
use crate::models::document::StagedDocument;
use crate::models::message::{Message, Role};
use store::ConversationStore;

#[derive(Debug, Error)]
#[error("another turn is already in progress for this session")]
pub struct TurnBusy;

/// Proof that the holder owns the session's single turn slot. Dropping it frees the
/// slot, so a streaming reply keeps it alive for as long as the stream is.
pub struct TurnPermit {
    _guard: OwnedMutexGuard<()>,
}

pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    history: Mutex<ConversationStore>,
    documents: Mutex<Vec<StagedDocument>>,
    credential: Mutex<Option<ApiKey>>,
    turn_gate: Arc<Mutex<()>>,
    last_active: std::sync::Mutex<Instant>,
}

impl Session {
    pub fn new(credential: Option<ApiKey>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            history: Mutex::new(ConversationStore::new()),
            documents: Mutex::new(Vec::new()),
            credential: Mutex::new(credential),
            turn_gate: Arc::new(Mutex::new(())),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// Claims the turn slot without waiting. Fails if a turn is already in flight.
    pub fn begin_turn(&self) -> Result<TurnPermit, TurnBusy> {
        self.touch();
        self.turn_gate
            .clone()
            .try_lock_owned()
            .map(|guard| TurnPermit { _guard: guard })
            .map_err(|_| TurnBusy)
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.history.lock().await.all().to_vec()
    }

    pub async fn append(&self, role: Role, content: impl Into<String>) -> Message {
        self.history.lock().await.append(role, content)
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    pub async fn documents(&self) -> Vec<StagedDocument> {
        self.documents.lock().await.clone()
    }

    pub async fn add_document(&self, document: StagedDocument) {
        self.documents.lock().await.push(document);
    }

    pub async fn credential(&self) -> Option<ApiKey> {
        self.credential.lock().await.clone()
    }

    pub async fn set_credential(&self, key: ApiKey) {
        *self.credential.lock().await = Some(key);
    }

    fn touch(&self) {
        if let Ok(mut last_active) = self.last_active.lock() {
            *last_active = Instant::now();
        }
    }

    /// Untouched for at least `ttl` and not in the middle of a turn.
    fn is_idle(&self, ttl: Duration) -> bool {
        let elapsed = match self.last_active.lock() {
            Ok(last_active) => last_active.elapsed(),
            Err(_) => return false,
        };
        elapsed >= ttl && self.turn_gate.try_lock().is_ok()
    }
}

/// Owns every live session. Ending a session drops its history and document set.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, credential: Option<ApiKey>) -> Arc<Session> {
        let session = Arc::new(Session::new(credential));
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        info!("Session {} started", session.id);
        session
    }

    /// Looks a session up and marks it active.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Returns false if the session did not exist.
    pub async fn end(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Session {id} ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ends every session idle for at least `ttl`. Returns the ids removed.
    pub async fn sweep_idle(&self, ttl: Duration) -> Vec<Uuid> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|session| session.is_idle(ttl))
            .map(|session| session.id)
            .collect();
        for id in &expired {
            sessions.remove(id);
            info!("Session {id} expired after {}s idle", ttl.as_secs());
        }
        expired
    }

    /// Runs `sweep_idle` periodically for the life of the process.
    pub fn spawn_sweeper(self: Arc<Self>, ttl: Duration) -> JoinHandle<()> {
        let period = (ttl / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.sweep_idle(ttl).await;
            }
        })
    }
}
