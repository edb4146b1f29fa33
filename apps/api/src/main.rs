mod chat;
mod config;
mod credentials;
mod documents;
mod errors;
mod llm_client;
mod models;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::gateway::{Gateway, GatewaySettings};
use crate::config::Config;
use crate::credentials::{EnvSecretStore, SecretStore, API_KEY_SECRET};
use crate::documents::stager::DocumentStager;
use crate::llm_client::gemini::GeminiClient;
use crate::llm_client::prompts::POLICY;
use crate::llm_client::ModelBackend;
use crate::routes::build_router;
use crate::session::SessionRegistry;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (also loads .env into the process environment)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TWK10 advisor v{}", env!("CARGO_PKG_VERSION"));

    // A missing key is not fatal: sessions start blocked until one is supplied.
    let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore);
    if secrets.lookup(API_KEY_SECRET).is_none() {
        warn!("{API_KEY_SECRET} is not set; sessions will need an interactively supplied key");
    }

    // Initialize the model backend
    let gemini = GeminiClient::new(
        config.gemini_api_base.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to build HTTP client")?;
    let backend: Arc<dyn ModelBackend> = Arc::new(gemini);
    info!(
        "Model gateway initialized (model: {}, temperature: {}, search: {}, policy: {})",
        config.model, config.temperature, config.enable_search_tool, POLICY.version
    );

    let gateway = Gateway::new(
        backend.clone(),
        GatewaySettings {
            model: config.model.clone(),
            fallback_model: config.fallback_model.clone(),
            temperature: config.temperature,
            search_grant: config.enable_search_tool,
            policy: &POLICY,
        },
    );

    // Transient storage for uploads
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    let stager = DocumentStager::new(
        backend,
        config.upload_dir.clone(),
        config.max_upload_bytes,
    );

    // Sessions abandoned without an explicit end are reclaimed after the idle window
    let sessions = Arc::new(SessionRegistry::new());
    sessions
        .clone()
        .spawn_sweeper(Duration::from_secs(config.session_idle_secs));
    info!("Session idle timeout: {}s", config.session_idle_secs);

    // Build app state
    let state = AppState {
        sessions,
        gateway: Arc::new(gateway),
        stager: Arc::new(stager),
        secrets,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the chat UI host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
