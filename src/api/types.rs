//! API request and response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response after creating a session.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionResponse {
    /// Unique session identifier
    pub id: Uuid,

    /// Creation timestamp (RFC 3339)
    pub created_at: String,

    /// Input placeholder for the chat surface
    pub greeting: String,
}

/// Request to send one user message to a session.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageRequest {
    /// The user's message text
    pub content: String,
}

/// Response carrying the assistant's answer for one turn.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessageResponse {
    /// The assistant's final natural-language answer
    pub answer: String,

    /// Number of completed turns in the session, including this one
    pub turn_count: usize,
}

/// One entry in a session transcript.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMessage {
    /// "user" or "assistant"
    pub role: String,

    /// Message text
    pub content: String,
}

/// Ordered transcript of a session.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<TranscriptMessage>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
