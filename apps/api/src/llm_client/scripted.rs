//! In-process `ModelBackend` test double. Replies are consumed in order and every
//! request is recorded so tests can assert on what would have been sent.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{FragmentStream, LlmError, ModelBackend, ModelRequest};
use crate::credentials::ApiKey;
use crate::models::document::FileHandle;

pub enum Script {
    Text(String),
    Fragments(Vec<String>),
    /// Emits the fragments, then fails mid-stream.
    FragmentsThenError(Vec<String>, LlmError),
    Fail(LlmError),
}

#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub display_name: String,
    pub existed_during_upload: bool,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ModelRequest>>,
    uploads: Mutex<Vec<UploadRecord>>,
    fail_uploads: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, script: Script) -> Self {
        self.replies.lock().unwrap().push_back(script);
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.reply(Script::Text(text.to_string()))
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads.lock().unwrap().clone()
    }

    fn next_script(&self, request: &ModelRequest) -> Script {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Fail(LlmError::EmptyContent))
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, _key: &ApiKey, request: &ModelRequest) -> Result<String, LlmError> {
        match self.next_script(request) {
            Script::Text(text) => Ok(text),
            Script::Fragments(parts) => Ok(parts.concat()),
            Script::FragmentsThenError(_, err) | Script::Fail(err) => Err(err),
        }
    }

    async fn generate_stream(
        &self,
        _key: &ApiKey,
        request: &ModelRequest,
    ) -> Result<FragmentStream, LlmError> {
        let items: Vec<Result<String, LlmError>> = match self.next_script(request) {
            Script::Text(text) => vec![Ok(text)],
            Script::Fragments(parts) => parts.into_iter().map(Ok).collect(),
            Script::FragmentsThenError(parts, err) => parts
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(err)))
                .collect(),
            Script::Fail(err) => return Err(err),
        };
        Ok(stream::iter(items).boxed())
    }

    async fn register_file(
        &self,
        _key: &ApiKey,
        display_name: &str,
        path: &Path,
        mime_type: &str,
    ) -> Result<FileHandle, LlmError> {
        let bytes = std::fs::read(path).unwrap_or_default();
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(UploadRecord {
            display_name: display_name.to_string(),
            existed_during_upload: path.exists(),
            bytes,
        });

        if self.fail_uploads {
            return Err(LlmError::Api {
                status: 503,
                message: "upload backend unavailable".to_string(),
            });
        }

        let n = uploads.len();
        Ok(FileHandle {
            name: format!("files/{n}"),
            uri: format!("https://files.example/{n}"),
            mime_type: mime_type.to_string(),
        })
    }
}
