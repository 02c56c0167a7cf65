//! Chat endpoint handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use super::types::{
    CreateSessionResponse, HealthResponse, PostMessageRequest, PostMessageResponse,
    TranscriptMessage, TranscriptResponse,
};
use super::AppState;
use crate::agent::AgentError;
use crate::session::{SessionError, Turn};

/// Input placeholder shown by the chat surface.
const GREETING: &str = "How can I assist you today?";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create a new chat session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Json<CreateSessionResponse> {
    let info = state.sessions.create_session().await;
    tracing::info!(session_id = %info.id, "Created session");
    Json(CreateSessionResponse {
        id: info.id,
        created_at: info.created_at,
        greeting: GREETING.to_string(),
    })
}

/// Send one user message and block until the agent answers.
///
/// The session is claimed for the duration of the turn; a concurrent
/// message on the same session is rejected rather than interleaved.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, (StatusCode, String)> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "content is required".to_string()));
    }

    let history = state.sessions.begin_turn(id).await.map_err(session_error)?;

    tracing::info!(
        session_id = %id,
        content_len = content.len(),
        history_turns = history.len(),
        "Received chat message"
    );

    match state.agent.run_turn(&history, &content).await {
        Ok(answer) => {
            state
                .sessions
                .complete_turn(
                    id,
                    Turn {
                        user_text: content,
                        assistant_text: answer.clone(),
                    },
                )
                .await
                .map_err(session_error)?;

            Ok(Json(PostMessageResponse {
                answer,
                turn_count: history.len() + 1,
            }))
        }
        Err(e) => {
            // Failed turns are not recorded; release the session as-is.
            if let Err(release) = state.sessions.abort_turn(id).await {
                tracing::warn!(session_id = %id, error = %release, "Failed to release session");
            }
            Err(agent_error(id, e))
        }
    }
}

/// The ordered transcript of user/assistant messages for a session.
pub async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscriptResponse>, (StatusCode, String)> {
    let turns = state.sessions.transcript(id).await.map_err(session_error)?;

    let mut messages = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        messages.push(TranscriptMessage {
            role: "user".to_string(),
            content: turn.user_text,
        });
        messages.push(TranscriptMessage {
            role: "assistant".to_string(),
            content: turn.assistant_text,
        });
    }

    Ok(Json(TranscriptResponse { messages }))
}

fn session_error(e: SessionError) -> (StatusCode, String) {
    match e {
        SessionError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        SessionError::Busy(_) => (StatusCode::CONFLICT, e.to_string()),
    }
}

/// Provider-level failures reach the user only as a generic notice; the
/// details go to the log.
fn agent_error(session_id: Uuid, e: AgentError) -> (StatusCode, String) {
    tracing::error!(session_id = %session_id, error = %e, "Agent turn failed");
    (
        StatusCode::BAD_GATEWAY,
        "The assistant could not process this message. Please try again.".to_string(),
    )
}
