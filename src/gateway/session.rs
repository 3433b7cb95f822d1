//! Session management for appointment-agent.
//!
//! A session is one conversation: its chat memory and the bookings waiting
//! for a yes/no answer. Sessions are shared behind an async mutex so that a
//! turn holds its conversation for the whole tool loop, while separate
//! conversations proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::agent::model::ChatTurn;
use crate::booking::BookingDesk;
use crate::error::SessionError;
use crate::gateway::config::SessionConfig;

const MAX_ID_LEN: usize = 128;

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Session timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum remembered turns per session
    pub max_history: usize,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 3600,
            max_history: 50,
        }
    }
}

impl From<&SessionConfig> for SessionManagerConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            timeout_seconds: config.timeout_seconds,
            max_history: config.max_history,
        }
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// One conversation.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    /// Client-visible conversation id
    pub id: String,

    /// Chat memory, oldest first
    pub history: Vec<ChatTurn>,

    /// Bookings awaiting confirmation in this conversation
    pub bookings: BookingDesk,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,

    /// Last activity timestamp (Unix milliseconds)
    pub last_activity: u64,
}

impl ConversationSession {
    pub fn new(id: &str) -> Self {
        let now = now_millis();
        Self {
            id: id.to_string(),
            history: Vec::new(),
            bookings: BookingDesk::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self, timeout_seconds: u64) -> bool {
        let elapsed_seconds = now_millis().saturating_sub(self.last_activity) / 1000;
        elapsed_seconds > timeout_seconds
    }

    /// Update the last activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = now_millis();
    }

    /// Append a turn, forgetting the oldest ones beyond `max_history`.
    ///
    /// After trimming, memory always starts at a user turn so no tool
    /// result is left without the call that produced it. The latest user
    /// turn is never dropped, so a turn still in progress may run past
    /// `max_history` until the next user message arrives.
    pub fn push_turn(&mut self, turn: ChatTurn, max_history: usize) {
        self.history.push(turn);

        if self.history.len() > max_history {
            let is_user = |t: &ChatTurn| matches!(t, ChatTurn::User { .. });
            let mut cut = self.history.len() - max_history;
            while cut < self.history.len() && !is_user(&self.history[cut]) {
                cut += 1;
            }
            if let Some(latest) = self.history.iter().rposition(is_user) {
                cut = cut.min(latest);
            }
            self.history.drain(..cut);
        }
        self.touch();
    }

    /// Number of user messages remembered.
    pub fn user_turns(&self) -> usize {
        self.history
            .iter()
            .filter(|t| matches!(t, ChatTurn::User { .. }))
            .count()
    }
}

/// Shared handle to a session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Session manager responsible for creating and maintaining sessions.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    config: SessionManagerConfig,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new() -> Self {
        Self::with_config(SessionManagerConfig::default())
    }

    /// Create a session manager with custom configuration.
    pub fn with_config(config: SessionManagerConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    fn validate_id(id: &str) -> Result<(), SessionError> {
        let valid = !id.is_empty()
            && id.len() <= MAX_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if valid {
            Ok(())
        } else {
            Err(SessionError::InvalidId(id.to_string()))
        }
    }

    /// Get the session for `id`, or start one.
    ///
    /// Without an id a fresh UUID is assigned. An expired session is
    /// replaced by an empty one under the same id.
    pub async fn get_or_create(&self, id: Option<&str>) -> Result<SessionHandle, SessionError> {
        let id = match id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => {
                Self::validate_id(id)?;
                id.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&id) {
            // A session locked by a running turn is in use, so not expired.
            let expired = existing
                .try_lock()
                .map(|s| s.is_expired(self.config.timeout_seconds))
                .unwrap_or(false);
            if !expired {
                return Ok(existing.clone());
            }
            tracing::info!("Session {} expired, starting over", id);
        }

        let session = Arc::new(Mutex::new(ConversationSession::new(&id)));
        sessions.insert(id.clone(), session.clone());
        tracing::debug!("Created session {}", id);
        Ok(session)
    }

    /// Get a session by ID.
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Clean up expired sessions.
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let timeout = self.config.timeout_seconds;
        let before = sessions.len();

        sessions.retain(|_, session| {
            session
                .try_lock()
                .map(|s| !s.is_expired(timeout))
                .unwrap_or(true)
        });

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("Removed {} expired sessions", removed);
        }
        removed
    }

    /// Summaries of idle sessions, most recently active first.
    ///
    /// Sessions locked by a running turn are skipped rather than waited on.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;

        let mut infos = Vec::with_capacity(sessions.len());
        for (id, handle) in sessions.iter() {
            match handle.try_lock() {
                Ok(session) => infos.push(SessionInfo::from(&*session)),
                Err(_) => tracing::debug!("Session {} is busy, leaving it out", id),
            }
        }
        infos.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        infos
    }

    /// Get the number of active sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Session information for API responses.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionInfo {
    /// Session ID
    pub id: String,
    /// User messages remembered
    pub turns: usize,
    /// Bookings waiting for an answer
    pub pending_bookings: usize,
    /// Creation timestamp
    pub created_at: u64,
    /// Last activity timestamp
    pub last_activity: u64,
}

impl From<&ConversationSession> for SessionInfo {
    fn from(session: &ConversationSession) -> Self {
        Self {
            id: session.id.clone(),
            turns: session.user_turns(),
            pending_bookings: session.bookings.len(),
            created_at: session.created_at,
            last_activity: session.last_activity,
        }
    }
}
