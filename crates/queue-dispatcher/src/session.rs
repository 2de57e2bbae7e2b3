//! Per-conversation session registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use agent_core::{AgentError, AgentRuntime, SessionHandle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, OnceCell, RwLock};
use tracing::{debug, info};

/// In-memory state for one conversation.
#[derive(Debug)]
pub struct ConversationSession {
    session_id: String,
    created_at: DateTime<Utc>,
    message_count: AtomicU64,
    handle: SessionHandle,
    /// Held while a message of this conversation is being answered.
    turn: Mutex<()>,
}

impl ConversationSession {
    fn new(session_id: &str, handle: SessionHandle) -> Self {
        Self {
            session_id: session_id.to_string(),
            created_at: Utc::now(),
            message_count: AtomicU64::new(0),
            handle,
            turn: Mutex::new(()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    /// The agent runtime's handle for this conversation.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Record one more processed message, returning the new count.
    pub fn increment(&self) -> u64 {
        self.message_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Wait for exclusive use of this conversation.
    ///
    /// Waiters are served in arrival order.
    pub async fn lock_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }
}

/// Snapshot of one tracked session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub remote_jid: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}

/// Snapshot of the registry. For observability only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub sessions: Vec<SessionInfo>,
}

type SessionCell = Arc<OnceCell<Arc<ConversationSession>>>;

/// Maps conversation keys (`remoteJid`) to sessions, creating them lazily.
///
/// Each key gets a `OnceCell` inserted under a short write lock; creation
/// then runs on the cell outside the map lock. Concurrent first deliveries
/// for one key therefore create exactly one session, while creations for
/// different keys do not wait on each other. A failed creation leaves the
/// cell empty so the next delivery retries.
pub struct SessionRegistry {
    agent: Arc<dyn AgentRuntime>,
    app_name: String,
    sessions: RwLock<HashMap<String, SessionCell>>,
}

impl SessionRegistry {
    pub fn new(agent: Arc<dyn AgentRuntime>, app_name: impl Into<String>) -> Self {
        Self {
            agent,
            app_name: app_name.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the session for `remote_jid`, creating it through the agent
    /// runtime if this is the first message of the conversation.
    pub async fn get_or_create(
        &self,
        remote_jid: &str,
    ) -> Result<Arc<ConversationSession>, AgentError> {
        let cell = self.cell(remote_jid).await;
        let session = cell
            .get_or_try_init(|| async {
                let handle = self
                    .agent
                    .create_session(&self.app_name, remote_jid, remote_jid)
                    .await?;
                info!("Created new session: {}", remote_jid);
                Ok::<_, AgentError>(Arc::new(ConversationSession::new(remote_jid, handle)))
            })
            .await?;
        Ok(session.clone())
    }

    /// Get an existing session without creating one.
    pub async fn get(&self, remote_jid: &str) -> Option<Arc<ConversationSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(remote_jid).and_then(|cell| cell.get().cloned())
    }

    /// Record one processed message for `remote_jid`.
    ///
    /// Returns the new count, or `None` if no session exists.
    pub async fn increment(&self, remote_jid: &str) -> Option<u64> {
        self.get(remote_jid).await.map(|session| session.increment())
    }

    /// Stop tracking a session. Returns whether one was tracked.
    ///
    /// The agent runtime is asked to release its side of the session, but
    /// what it frees is up to the runtime.
    pub async fn cleanup(&self, remote_jid: &str) -> bool {
        let removed = self.sessions.write().await.remove(remote_jid);
        match removed.and_then(|cell| cell.get().cloned()) {
            Some(session) => {
                info!(
                    "Cleaning up session: {} ({} messages)",
                    session.session_id(),
                    session.message_count()
                );
                self.agent.release_session(session.handle()).await;
                true
            }
            None => false,
        }
    }

    /// Number of sessions created and still tracked.
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|cell| cell.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every tracked session, oldest first.
    pub async fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read().await;
        let mut infos: Vec<SessionInfo> = sessions
            .iter()
            .filter_map(|(jid, cell)| {
                cell.get().map(|session| SessionInfo {
                    remote_jid: jid.clone(),
                    session_id: session.session_id().to_string(),
                    created_at: session.created_at(),
                    message_count: session.message_count(),
                })
            })
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        SessionStats {
            active_sessions: infos.len(),
            sessions: infos,
        }
    }

    async fn cell(&self, remote_jid: &str) -> SessionCell {
        if let Some(cell) = self.sessions.read().await.get(remote_jid) {
            return cell.clone();
        }
        let mut sessions = self.sessions.write().await;
        let cell = sessions.entry(remote_jid.to_string()).or_default().clone();
        debug!("Tracking conversation key: {}", remote_jid);
        cell
    }
}
