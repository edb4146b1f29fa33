use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Lower-cost tier suggested to users after a rate-limit rejection.
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
/// Temperatures above this are rejected at startup; answers must stay close to the sources.
pub const MAX_TEMPERATURE: f32 = 0.2;

/// Application configuration loaded from environment variables.
///
/// The Gemini API key is not part of this struct. It is looked up
/// through `credentials::SecretStore` so that its absence stays a per-session state.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_base: String,
    pub model: String,
    pub fallback_model: String,
    pub temperature: f32,
    pub enable_search_tool: bool,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Limit for a whole multipart upload request, which may carry several files.
    pub max_batch_bytes: usize,
    pub request_timeout_secs: u64,
    /// Sessions untouched for this long are ended by the background sweeper.
    pub session_idle_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let temperature = optional_env("MODEL_TEMPERATURE")
            .map(|v| {
                v.parse::<f32>()
                    .context("MODEL_TEMPERATURE must be a number")
            })
            .transpose()?
            .unwrap_or(DEFAULT_TEMPERATURE);
        validate_temperature(temperature)?;

        Ok(Config {
            gemini_api_base: optional_env("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            model: optional_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            fallback_model: optional_env("FALLBACK_MODEL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string()),
            temperature,
            enable_search_tool: optional_env("ENABLE_SEARCH_TOOL")
                .map(|v| parse_bool(&v))
                .transpose()
                .context("ENABLE_SEARCH_TOOL must be true/false")?
                .unwrap_or(true),
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|| (20 * 1024 * 1024).to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a positive integer")?,
            max_batch_bytes: optional_env("MAX_BATCH_BYTES")
                .unwrap_or_else(|| (100 * 1024 * 1024).to_string())
                .parse::<usize>()
                .context("MAX_BATCH_BYTES must be a positive integer")?,
            request_timeout_secs: optional_env("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|| "120".to_string())
                .parse::<u64>()
                .context("REQUEST_TIMEOUT_SECS must be a positive integer")?,
            session_idle_secs: parse_idle_secs(
                &optional_env("SESSION_IDLE_SECS").unwrap_or_else(|| "1800".to_string()),
            )?,
            port: optional_env("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Reads a variable, treating blank values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean '{other}'"),
    }
}

fn parse_idle_secs(value: &str) -> Result<u64> {
    let secs = value
        .parse::<u64>()
        .context("SESSION_IDLE_SECS must be a positive integer")?;
    if secs == 0 {
        bail!("SESSION_IDLE_SECS must be greater than zero");
    }
    Ok(secs)
}

fn validate_temperature(temperature: f32) -> Result<()> {
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        bail!("MODEL_TEMPERATURE must be between 0.0 and {MAX_TEMPERATURE}, got {temperature}");
    }
    Ok(())
}
