//! Model Gateway — composes one request per turn and hands it to the backend.
//!
//! Every request carries the compiled-in policy instruction verbatim, the configured
//! low temperature, the optional search grant and the session's staged documents.
//! Responses are never cached and calls are never retried here.

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info};

use crate::chat::notice::Notice;
use crate::credentials::ApiKey;
use crate::llm_client::prompts::PolicyInstruction;
use crate::llm_client::{FragmentStream, LlmError, ModelBackend, ModelRequest};
use crate::models::document::StagedDocument;

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub model: String,
    /// Suggested to users after a rate-limit rejection.
    pub fallback_model: String,
    pub temperature: f32,
    pub search_grant: bool,
    pub policy: &'static PolicyInstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Complete,
    Streaming,
}

pub enum Reply {
    Complete(String),
    Streaming(FragmentStream),
}

impl Reply {
    /// Full text of the reply, concatenating fragments in arrival order.
    pub async fn into_text(self) -> Result<String, LlmError> {
        match self {
            Reply::Complete(text) => Ok(text),
            Reply::Streaming(mut fragments) => {
                let mut text = String::new();
                while let Some(fragment) = fragments.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Returns the prompt unchanged if it has any non-whitespace content.
pub fn validate_prompt(prompt: &str) -> Result<&str, GatewayError> {
    if prompt.trim().is_empty() {
        Err(GatewayError::EmptyPrompt)
    } else {
        Ok(prompt)
    }
}

pub struct Gateway {
    backend: Arc<dyn ModelBackend>,
    settings: GatewaySettings,
}

impl Gateway {
    pub fn new(backend: Arc<dyn ModelBackend>, settings: GatewaySettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Builds the request for this turn. Nothing here is reused across calls.
    pub fn compose(&self, prompt: &str, documents: &[StagedDocument]) -> ModelRequest {
        ModelRequest {
            model: self.settings.model.clone(),
            system_instruction: self.settings.policy.text.to_string(),
            prompt: prompt.to_string(),
            documents: documents.iter().map(|d| d.handle.clone()).collect(),
            temperature: self.settings.temperature,
            search_grant: self.settings.search_grant,
        }
    }

    pub async fn ask(
        &self,
        key: &ApiKey,
        prompt: &str,
        documents: &[StagedDocument],
        mode: ResponseMode,
    ) -> Result<Reply, GatewayError> {
        let prompt = validate_prompt(prompt)?;
        let request = self.compose(prompt, documents);

        info!(
            "Asking {} (mode={:?}, documents={}, policy={})",
            request.model,
            mode,
            request.documents.len(),
            self.settings.policy.version
        );
        debug!("Prompt length: {} chars", prompt.chars().count());

        let reply = match mode {
            ResponseMode::Complete => {
                Reply::Complete(self.backend.generate(key, &request).await?)
            }
            ResponseMode::Streaming => {
                Reply::Streaming(self.backend.generate_stream(key, &request).await?)
            }
        };
        Ok(reply)
    }

    pub fn notice(&self, err: &LlmError) -> Notice {
        Notice::from_llm_error(err, &self.settings.fallback_model)
    }
}
