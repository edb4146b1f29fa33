//! Document Stager — hands uploaded literature to the provider's Files API.
//!
//! Each upload is written to its own uniquely named temporary file, registered, and
//! the temporary file is removed on every exit path (the `NamedTempFile` guard also
//! covers early returns and panics).

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chat::notice::Notice;
use crate::credentials::ApiKey;
use crate::llm_client::{LlmError, ModelBackend};
use crate::models::document::StagedDocument;
use crate::session::Session;

pub const PDF_MIME: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";

/// A file as delivered by the upload surface.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("{name} is not a PDF document")]
    UnsupportedFormat { name: String },

    #[error("{name} is empty")]
    Empty { name: String },

    #[error("{name} exceeds the {limit} byte upload limit")]
    TooLarge { name: String, limit: usize },

    #[error("transient storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("provider registration failed: {0}")]
    Registration(#[source] LlmError),
}

impl StagingError {
    /// Per-file, user-facing explanation.
    pub fn notice(&self, file_name: &str) -> Notice {
        let message = match self {
            StagingError::UnsupportedFormat { .. } => {
                format!("檔案「{file_name}」不是 PDF 文件，僅接受 PDF 格式。")
            }
            StagingError::Empty { .. } => format!("檔案「{file_name}」內容為空。"),
            StagingError::TooLarge { limit, .. } => format!(
                "檔案「{file_name}」超過上傳上限（{} MB）。",
                limit / (1024 * 1024)
            ),
            StagingError::Storage(_) | StagingError::Registration(_) => {
                format!("檔案「{file_name}」上傳失敗，請稍後再試。")
            }
        };
        Notice::staging(message)
    }
}

/// Result for one file of a batch.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StagingOutcome {
    Staged {
        document: StagedDocument,
    },
    Failed {
        file_name: String,
        notice: Notice,
    },
}

pub struct DocumentStager {
    backend: Arc<dyn ModelBackend>,
    upload_dir: PathBuf,
    max_bytes: usize,
}

impl DocumentStager {
    pub fn new(backend: Arc<dyn ModelBackend>, upload_dir: PathBuf, max_bytes: usize) -> Self {
        Self {
            backend,
            upload_dir,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Stages a single file. The transient copy never outlives this call.
    pub async fn stage(
        &self,
        key: &ApiKey,
        file: &UploadedFile,
    ) -> Result<StagedDocument, StagingError> {
        self.validate(file)?;

        let transient = self.write_transient(file.bytes.clone()).await?;

        let registered = self
            .backend
            .register_file(key, &file.name, transient.path(), PDF_MIME)
            .await;

        if let Err(e) = transient.close() {
            warn!("Failed to remove transient copy of {}: {}", file.name, e);
        }

        let handle = registered.map_err(StagingError::Registration)?;
        info!("Staged {} as {}", file.name, handle.name);

        Ok(StagedDocument {
            id: Uuid::new_v4(),
            local_name: file.name.clone(),
            handle,
            size_bytes: file.bytes.len() as u64,
            staged_at: Utc::now(),
        })
    }

    /// Stages every file independently and adds the successes to the session's
    /// document set. One failure never stops the rest of the batch.
    pub async fn stage_batch(
        &self,
        session: &Session,
        key: &ApiKey,
        files: Vec<UploadedFile>,
    ) -> Vec<StagingOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());
        for file in files {
            match self.stage(key, &file).await {
                Ok(document) => {
                    session.add_document(document.clone()).await;
                    outcomes.push(StagingOutcome::Staged { document });
                }
                Err(e) => {
                    warn!("Staging {} failed: {}", file.name, e);
                    outcomes.push(StagingOutcome::Failed {
                        notice: e.notice(&file.name),
                        file_name: file.name,
                    });
                }
            }
        }
        outcomes
    }

    /// Writes the bytes to a fresh uniquely named file. Runs on the blocking pool since
    /// uploads can be tens of megabytes.
    async fn write_transient(&self, bytes: Bytes) -> Result<NamedTempFile, StagingError> {
        let upload_dir = self.upload_dir.clone();
        let transient = tokio::task::spawn_blocking(move || -> io::Result<NamedTempFile> {
            let mut transient = tempfile::Builder::new()
                .prefix("upload-")
                .suffix(".pdf")
                .tempfile_in(&upload_dir)?;
            transient.write_all(&bytes)?;
            transient.flush()?;
            Ok(transient)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        Ok(transient)
    }

    fn validate(&self, file: &UploadedFile) -> Result<(), StagingError> {
        if file.bytes.is_empty() {
            return Err(StagingError::Empty {
                name: file.name.clone(),
            });
        }
        if file.bytes.len() > self.max_bytes {
            return Err(StagingError::TooLarge {
                name: file.name.clone(),
                limit: self.max_bytes,
            });
        }

        let declared_pdf = file.name.to_ascii_lowercase().ends_with(".pdf")
            || file.content_type.as_deref() == Some(PDF_MIME);
        if !declared_pdf || !file.bytes.starts_with(PDF_MAGIC) {
            return Err(StagingError::UnsupportedFormat {
                name: file.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::scripted::ScriptedBackend;

    fn pdf(name: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            content_type: Some(PDF_MIME.to_string()),
            bytes: Bytes::from_static(b"%PDF-1.7\nTWK10 study"),
        }
    }

    fn key() -> ApiKey {
        ApiKey::parse("k").unwrap()
    }

    fn dir_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_stage_registers_and_removes_transient_copy() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new());
        let stager = DocumentStager::new(backend.clone(), dir.path().to_path_buf(), 1024);

        let doc = stager.stage(&key(), &pdf("study.pdf")).await.unwrap();
        assert_eq!(doc.local_name, "study.pdf");
        assert_eq!(doc.handle.mime_type, PDF_MIME);

        let uploads = backend.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].existed_during_upload);
        assert_eq!(uploads[0].bytes, b"%PDF-1.7\nTWK10 study");
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_large_upload_is_written_intact() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new());
        let stager = DocumentStager::new(backend.clone(), dir.path().to_path_buf(), 4 << 20);

        let mut content = b"%PDF-1.7\n".to_vec();
        content.resize(3 << 20, b'x');
        let upload = UploadedFile {
            bytes: Bytes::from(content.clone()),
            ..pdf("large.pdf")
        };

        let doc = stager.stage(&key(), &upload).await.unwrap();
        assert_eq!(doc.size_bytes, 3 << 20);
        assert_eq!(backend.uploads()[0].bytes, content);
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_missing_upload_dir_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new());
        let stager = DocumentStager::new(backend.clone(), dir.path().join("gone"), 1024);

        let err = stager.stage(&key(), &pdf("a.pdf")).await.unwrap_err();
        assert!(matches!(err, StagingError::Storage(_)));
        assert!(backend.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_failed_registration_cleans_up_and_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new().failing_uploads());
        let stager = DocumentStager::new(backend, dir.path().to_path_buf(), 1024);
        let session = Session::new(ApiKey::parse("k"));

        let outcomes = stager
            .stage_batch(&session, &key(), vec![pdf("a.pdf")])
            .await;

        assert!(matches!(outcomes[0], StagingOutcome::Failed { .. }));
        assert!(dir_is_empty(&dir));
        assert!(session.documents().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_continues_after_a_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new());
        let stager = DocumentStager::new(backend.clone(), dir.path().to_path_buf(), 1024);
        let session = Session::new(ApiKey::parse("k"));

        let not_pdf = UploadedFile {
            name: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            bytes: Bytes::from_static(b"plain text"),
        };
        let outcomes = stager
            .stage_batch(&session, &key(), vec![not_pdf, pdf("b.pdf"), pdf("b.pdf")])
            .await;

        assert_eq!(outcomes.len(), 3);
        match &outcomes[0] {
            StagingOutcome::Failed { file_name, notice } => {
                assert_eq!(file_name, "notes.txt");
                assert_eq!(notice.kind, crate::chat::notice::FailureKind::Staging);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(outcomes[1], StagingOutcome::Staged { .. }));
        assert!(matches!(outcomes[2], StagingOutcome::Staged { .. }));

        // Same local name twice: both staged, distinct handles.
        let docs = session.documents().await;
        assert_eq!(docs.len(), 2);
        assert_ne!(docs[0].handle.name, docs[1].handle.name);
        assert_eq!(backend.uploads().len(), 2);
        assert!(dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_rejects_oversized_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new());
        let stager = DocumentStager::new(backend.clone(), dir.path().to_path_buf(), 8);

        let big = stager.stage(&key(), &pdf("big.pdf")).await.unwrap_err();
        assert!(matches!(big, StagingError::TooLarge { limit: 8, .. }));

        let empty = UploadedFile {
            bytes: Bytes::new(),
            ..pdf("empty.pdf")
        };
        let err = stager.stage(&key(), &empty).await.unwrap_err();
        assert!(matches!(err, StagingError::Empty { .. }));
        assert!(backend.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_pdf_extension_without_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stager = DocumentStager::new(
            Arc::new(ScriptedBackend::new()),
            dir.path().to_path_buf(),
            1024,
        );
        let fake = UploadedFile {
            name: "fake.pdf".to_string(),
            content_type: None,
            bytes: Bytes::from_static(b"<html></html>"),
        };
        let err = stager.stage(&key(), &fake).await.unwrap_err();
        assert!(matches!(err, StagingError::UnsupportedFormat { .. }));
    }
}
