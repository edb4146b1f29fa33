pub mod health;
pub mod meta;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::chat::handlers as chat;
use crate::documents::handlers as documents;
use crate::session::handlers as sessions;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let batch_limit = state.config.max_batch_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/meta", get(meta::handle_meta))
        // Session lifecycle
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route("/api/v1/sessions/:id", delete(sessions::handle_end_session))
        .route(
            "/api/v1/sessions/:id/credential",
            put(sessions::handle_set_credential),
        )
        // Conversation
        .route(
            "/api/v1/sessions/:id/messages",
            get(sessions::handle_list_messages)
                .post(chat::handle_ask)
                .delete(sessions::handle_clear_messages),
        )
        .route(
            "/api/v1/sessions/:id/messages/stream",
            post(chat::handle_ask_stream),
        )
        // Literature
        .route(
            "/api/v1/sessions/:id/documents",
            get(documents::handle_list_documents)
                .post(documents::handle_upload)
                .layer(DefaultBodyLimit::max(batch_limit)),
        )
        .with_state(state)
}
