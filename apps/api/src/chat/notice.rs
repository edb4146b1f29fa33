//! User-visible failure notices. Raw provider diagnostics are logged, never shown.

use std::time::Duration;

use serde::Serialize;

use crate::llm_client::LlmError;

pub const CONFIGURATION_MESSAGE: &str = "系統尚未完成 API 設定，請聯絡 PM。";
pub const TRANSPORT_MESSAGE: &str = "發生連線錯誤，請稍後再試。";
/// Wait suggested when the provider did not send `Retry-After`.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Staging,
    Transport,
    Authentication,
    RateLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: FailureKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_model: Option<String>,
}

impl Notice {
    fn plain(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
            suggested_model: None,
        }
    }

    pub fn configuration() -> Self {
        Self::plain(FailureKind::Configuration, CONFIGURATION_MESSAGE)
    }

    pub fn staging(message: impl Into<String>) -> Self {
        Self::plain(FailureKind::Staging, message)
    }

    /// Maps a provider failure. Rate limits carry a wait and a cheaper model to try.
    pub fn from_llm_error(err: &LlmError, fallback_model: &str) -> Self {
        match err {
            LlmError::RateLimited { retry_after, .. } => {
                let wait = retry_after.unwrap_or(DEFAULT_RETRY_WAIT).as_secs().max(1);
                Self {
                    kind: FailureKind::RateLimit,
                    message: format!(
                        "目前請求量過高，請等待約 {wait} 秒後再試，或改用較低成本的模型（{fallback_model}）。"
                    ),
                    retry_after_secs: Some(wait),
                    suggested_model: Some(fallback_model.to_string()),
                }
            }
            LlmError::Authentication { .. } => {
                Self::plain(FailureKind::Authentication, TRANSPORT_MESSAGE)
            }
            LlmError::Http(_)
            | LlmError::Api { .. }
            | LlmError::Parse(_)
            | LlmError::Io(_)
            | LlmError::Timeout(_)
            | LlmError::EmptyContent => Self::plain(FailureKind::Transport, TRANSPORT_MESSAGE),
        }
    }
}
