/// LLM Client — the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider directly.
/// Everything goes through a `ModelBackend`, which keeps the provider swappable
/// in tests and keeps credentials out of the request types.
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::credentials::ApiKey;
use crate::models::document::FileHandle;

pub mod gemini;
pub mod prompts;
#[cfg(test)]
pub mod scripted;
pub mod sse;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication rejected (status {status}): {message}")]
    Authentication { status: u16, message: String },

    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One fully composed call. Built fresh for every turn and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    /// Policy text, included verbatim.
    pub system_instruction: String,
    pub prompt: String,
    pub documents: Vec<FileHandle>,
    pub temperature: f32,
    /// Lets the model consult the provider's web search tool.
    pub search_grant: bool,
}

/// Lazy, ordered, finite stream of text fragments. Consumed once.
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// The provider seam. `GeminiClient` is the production implementation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Blocks until the whole response text is available.
    async fn generate(&self, key: &ApiKey, request: &ModelRequest) -> Result<String, LlmError>;

    /// Returns as soon as the provider accepted the request; text arrives through the stream.
    async fn generate_stream(
        &self,
        key: &ApiKey,
        request: &ModelRequest,
    ) -> Result<FragmentStream, LlmError>;

    /// Uploads the file at `path` and returns the provider handle for later requests.
    async fn register_file(
        &self,
        key: &ApiKey,
        display_name: &str,
        path: &Path,
        mime_type: &str,
    ) -> Result<FileHandle, LlmError>;
}
