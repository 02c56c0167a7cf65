//! Chat sessions and conversation memory (non-persistent).
//!
//! A session owns the ordered history of completed turns for one user.
//! History grows monotonically within a session and is replayed in full
//! into every model call; there is no eviction or summarization. Sessions
//! live only in memory and do not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One completed (user message, assistant answer) exchange.
///
/// Immutable once created: a turn is only constructed after the agent loop
/// reaches a final answer, and failed turns are never recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub user_text: String,
    pub assistant_text: String,
}

/// Append-only log of past turns, insertion order significant.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed turn.
    pub fn record(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The full history in chronological order.
    pub fn replay(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Session {0} is already processing a message")]
    Busy(Uuid),
}

/// A single chat session.
#[derive(Debug)]
struct Session {
    memory: ConversationMemory,
    created_at: String,
    /// Set while a turn is in flight; the surface is request/response and
    /// does not interleave turns within one session.
    turn_in_flight: bool,
}

/// Session metadata returned to the API layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub created_at: String,
    pub turn_count: usize,
}

/// In-memory session store.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new session and return its metadata.
    pub async fn create_session(&self) -> SessionInfo {
        let id = Uuid::new_v4();
        let created_at = now_string();
        let session = Session {
            memory: ConversationMemory::new(),
            created_at: created_at.clone(),
            turn_in_flight: false,
        };
        self.sessions.write().await.insert(id, session);
        SessionInfo {
            id,
            created_at,
            turn_count: 0,
        }
    }

    pub async fn get_session(&self, id: Uuid) -> Result<SessionInfo, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        Ok(SessionInfo {
            id,
            created_at: session.created_at.clone(),
            turn_count: session.memory.len(),
        })
    }

    /// Claim the session for one turn and return the replayed history.
    ///
    /// Fails if another turn is already in flight; the caller must finish
    /// with either `complete_turn` or `abort_turn`.
    pub async fn begin_turn(&self, id: Uuid) -> Result<Vec<Turn>, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if session.turn_in_flight {
            return Err(SessionError::Busy(id));
        }
        session.turn_in_flight = true;
        Ok(session.memory.replay().to_vec())
    }

    /// Record a completed turn and release the session.
    pub async fn complete_turn(&self, id: Uuid, turn: Turn) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.memory.record(turn);
        session.turn_in_flight = false;
        Ok(())
    }

    /// Release the session without recording anything (failed turn).
    pub async fn abort_turn(&self, id: Uuid) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.turn_in_flight = false;
        Ok(())
    }

    /// The ordered transcript of a session.
    pub async fn transcript(&self, id: Uuid) -> Result<Vec<Turn>, SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        Ok(session.memory.replay().to_vec())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_string() -> String {
    Utc::now().to_rfc3339()
}
