use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::documents::stager::{StagingOutcome, UploadedFile};
use crate::errors::AppError;
use crate::models::document::StagedDocument;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub outcomes: Vec<StagingOutcome>,
    pub active_documents: usize,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<StagedDocument>,
}

/// POST /api/v1/sessions/:id/documents
///
/// Multipart batch upload. Every part that carries a filename is staged on its own;
/// per-file failures are reported in `outcomes` and do not fail the request.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let session = state.session(id).await?;
    let _permit = session.begin_turn()?;
    let key = session.credential().await.ok_or(AppError::Configuration)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read {name}: {e}")))?;
        files.push(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(AppError::Validation("no files in upload".to_string()));
    }

    info!("Session {} staging {} file(s)", session.id, files.len());
    let outcomes = state.stager.stage_batch(&session, &key, files).await;

    Ok(Json(UploadResponse {
        outcomes,
        active_documents: session.documents().await.len(),
    }))
}

/// GET /api/v1/sessions/:id/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentsResponse>, AppError> {
    let session = state.session(id).await?;
    Ok(Json(DocumentsResponse {
        documents: session.documents().await,
    }))
}
