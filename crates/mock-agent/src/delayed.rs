//! Delayed agent implementation - wraps another agent with artificial delay.

use std::time::Duration;

use agent_core::{async_trait, AgentError, AgentReply, AgentRuntime, SessionHandle};
use tokio::time::sleep;

/// An agent that wraps another agent and adds artificial delay to invocations.
///
/// Useful for testing timeout handling and simulating model latency.
pub struct DelayedAgent<R: AgentRuntime> {
    inner: R,
    delay: Duration,
}

impl<R: AgentRuntime> DelayedAgent<R> {
    /// Create a new DelayedAgent wrapping the given agent with the specified delay.
    pub fn new(inner: R, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create an agent with a delay in milliseconds.
    pub fn with_millis(inner: R, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: AgentRuntime> AgentRuntime for DelayedAgent<R> {
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        self.inner.create_session(app_id, user_id, session_id).await
    }

    async fn invoke(&self, session: &SessionHandle, prompt: &str) -> Result<AgentReply, AgentError> {
        sleep(self.delay).await;
        self.inner.invoke(session, prompt).await
    }

    fn name(&self) -> &str {
        "DelayedAgent"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn shutdown(&self) -> Result<(), AgentError> {
        self.inner.shutdown().await
    }
}
