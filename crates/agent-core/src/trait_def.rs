//! The AgentRuntime trait definition.

use async_trait::async_trait;

use crate::error::AgentError;

/// Opaque handle to a session held inside an agent runtime.
///
/// The worker never looks inside a handle; it only passes it back to the
/// runtime that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    app_id: String,
    user_id: String,
    session_id: String,
}

impl SessionHandle {
    /// Create a handle for the given app, user and session identity.
    pub fn new(
        app_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// The text produced by one agent invocation, plus whatever usage details
/// the runtime was able to report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    /// Best-effort reply text.
    pub text: String,
    /// Names of tools the agent called while answering.
    pub tools_used: Vec<String>,
    /// Token usage reported by the provider, if any.
    pub tokens_used: Option<u32>,
}

impl AgentReply {
    /// Create a reply carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach provider-reported token usage.
    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

/// A language-model agent that can hold per-conversation sessions.
///
/// Implementations range from echo stubs to hosted model deployments.
/// This trait is object-safe and can be used as `Arc<dyn AgentRuntime>`.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Create a session inside the runtime.
    ///
    /// Called once per conversation key. The returned handle is passed back
    /// to [`invoke`](Self::invoke) for every later message of that conversation.
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError>;

    /// Submit a prompt bound to a session and wait for the reply text.
    async fn invoke(&self, session: &SessionHandle, prompt: &str) -> Result<AgentReply, AgentError>;

    /// Get a human-readable name for this runtime.
    fn name(&self) -> &str;

    /// Model identifier reported in response metadata.
    fn model(&self) -> &str {
        "unknown"
    }

    /// Release runtime resources held for a session.
    ///
    /// Default implementation does nothing.
    async fn release_session(&self, _session: &SessionHandle) {}

    /// Gracefully shut down the runtime.
    ///
    /// Default implementation does nothing.
    async fn shutdown(&self) -> Result<(), AgentError> {
        Ok(())
    }
}
