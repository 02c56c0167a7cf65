//! HTTP API - the presentation surface of the chat agent.
//!
//! One session maps to one conversation; each message is a blocking
//! request/response turn through the agent loop.

mod chat;
pub mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::Agent;
use crate::config::Config;
use crate::db::SqliteDatabase;
use crate::llm::OpenRouterClient;
use crate::session::SessionStore;

/// Shared application state.
pub struct AppState {
    pub agent: Arc<Agent>,
    pub sessions: SessionStore,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(chat::health))
        .route("/api/sessions", post(chat::create_session))
        .route("/api/sessions/:id/messages", post(chat::post_message))
        .route("/api/sessions/:id/transcript", get(chat::get_transcript))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the database, build the agent, and serve the HTTP API.
///
/// # Errors
///
/// Fails fast if the database cannot be opened or its schema cannot be
/// inspected; the system prompt depends on the table set.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db = Arc::new(SqliteDatabase::open(&config.database_path)?);

    let llm = Arc::new(OpenRouterClient::new(
        config.api_key.clone(),
        config.llm_timeout_secs,
        config.temperature,
    ));

    let agent = Arc::new(Agent::new(&config, llm, db).await?);
    let state = Arc::new(AppState {
        agent,
        sessions: SessionStore::new(),
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
