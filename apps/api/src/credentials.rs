//! Credential Resolver — turns the secret store and/or an interactively supplied
//! token into a usable Gemini API key, or reports that none is available.
//!
//! There are no retries: a missing key is a configuration precondition.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Name of the secret holding the Gemini API key.
pub const API_KEY_SECRET: &str = "GEMINI_API_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no API key configured in the secret store and none supplied interactively")]
    Missing,
}

/// Key-value lookup for secrets. Absence is an expected state, not an error.
pub trait SecretStore: Send + Sync {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads secrets from the process environment (`.env` is loaded by `Config::from_env`).
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl SecretStore for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A non-empty API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<REDACTED>")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Resolves the key for a session. A non-blank interactive token takes precedence
/// over the secret store.
pub fn resolve(
    store: &dyn SecretStore,
    interactive: Option<&str>,
) -> Result<ApiKey, CredentialError> {
    if let Some(key) = interactive.and_then(ApiKey::parse) {
        tracing::debug!("Using interactively supplied API key");
        return Ok(key);
    }

    store
        .lookup(API_KEY_SECRET)
        .as_deref()
        .and_then(ApiKey::parse)
        .ok_or(CredentialError::Missing)
}
