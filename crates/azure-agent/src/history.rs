//! Per-session conversation history.
//!
//! Turn-based trimming per session, plus LRU eviction across sessions so a
//! flood of distinct conversations cannot grow memory without bound.

use indexmap::IndexMap;
use tokio::sync::RwLock;

/// Default maximum number of sessions to track before LRU eviction.
const DEFAULT_MAX_SESSIONS: usize = 10000;

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMessage {
    /// Role: "user" or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Conversation history keyed by session id.
#[derive(Debug)]
pub struct SessionHistory {
    /// Insertion order doubles as recency order for eviction.
    sessions: RwLock<IndexMap<String, Vec<HistoryMessage>>>,
    /// Maximum number of turns (user + assistant pairs) to keep per session.
    max_turns: usize,
    max_sessions: usize,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SessionHistory {
    /// Create a history with the given max turns and the default session limit.
    pub fn new(max_turns: usize) -> Self {
        Self::with_limits(max_turns, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(max_turns: usize, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(IndexMap::new()),
            max_turns,
            max_sessions,
        }
    }

    /// Start tracking a session. Existing history is kept.
    pub async fn open(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session_id) {
            sessions.insert(session_id.to_string(), Vec::new());
            Self::evict(&mut sessions, self.max_sessions);
        }
    }

    /// Get the history for a session, marking it recently used.
    pub async fn get(&self, session_id: &str) -> Vec<HistoryMessage> {
        let mut sessions = self.sessions.write().await;
        match sessions.shift_remove(session_id) {
            Some(entry) => {
                let result = entry.clone();
                sessions.insert(session_id.to_string(), entry);
                result
            }
            None => Vec::new(),
        }
    }

    /// Record a user prompt and the assistant reply.
    pub async fn add_exchange(&self, session_id: &str, user_msg: &str, assistant_msg: &str) {
        let mut sessions = self.sessions.write().await;

        let mut history = sessions.shift_remove(session_id).unwrap_or_default();
        history.push(HistoryMessage::user(user_msg));
        history.push(HistoryMessage::assistant(assistant_msg));

        // Each turn is 2 messages
        let max_messages = self.max_turns * 2;
        if history.len() > max_messages {
            let to_remove = history.len() - max_messages;
            history.drain(0..to_remove);
        }

        sessions.insert(session_id.to_string(), history);
        Self::evict(&mut sessions, self.max_sessions);
    }

    pub async fn clear(&self, session_id: &str) {
        self.sessions.write().await.shift_remove(session_id);
    }

    pub async fn clear_all(&self) {
        self.sessions.write().await.clear();
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn evict(sessions: &mut IndexMap<String, Vec<HistoryMessage>>, max_sessions: usize) {
        while sessions.len() > max_sessions {
            sessions.shift_remove_index(0);
        }
    }
}
