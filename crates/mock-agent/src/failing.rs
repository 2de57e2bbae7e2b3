//! Failing agent implementation - fails on purpose.

use agent_core::{async_trait, AgentError, AgentReply, AgentRuntime, SessionHandle};

/// Where a [`FailingAgent`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// `invoke` returns an error.
    Invoke,
    /// `create_session` returns an error.
    CreateSession,
    /// `invoke` panics.
    Panic,
}

/// An agent that always fails in the configured way.
#[derive(Debug, Clone)]
pub struct FailingAgent {
    mode: FailureMode,
    message: String,
}

impl FailingAgent {
    pub fn new(mode: FailureMode, message: impl Into<String>) -> Self {
        Self {
            mode,
            message: message.into(),
        }
    }

    /// Fail every invocation with a processing error.
    pub fn on_invoke(message: impl Into<String>) -> Self {
        Self::new(FailureMode::Invoke, message)
    }

    /// Fail every session creation.
    pub fn on_create_session(message: impl Into<String>) -> Self {
        Self::new(FailureMode::CreateSession, message)
    }

    /// Panic inside every invocation.
    pub fn panicking() -> Self {
        Self::new(FailureMode::Panic, "agent panicked")
    }
}

#[async_trait]
impl AgentRuntime for FailingAgent {
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        if self.mode == FailureMode::CreateSession {
            return Err(AgentError::Unavailable(self.message.clone()));
        }
        Ok(SessionHandle::new(app_id, user_id, session_id))
    }

    async fn invoke(&self, _session: &SessionHandle, _prompt: &str) -> Result<AgentReply, AgentError> {
        match self.mode {
            FailureMode::Panic => panic!("{}", self.message),
            _ => Err(AgentError::ProcessingFailed(self.message.clone())),
        }
    }

    fn name(&self) -> &str {
        "FailingAgent"
    }
}
