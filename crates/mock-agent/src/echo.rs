//! Echo agent implementation - echoes prompts back.

use std::sync::atomic::{AtomicUsize, Ordering};

use agent_core::{async_trait, AgentError, AgentReply, AgentRuntime, SessionHandle};

/// A simple agent that echoes the prompt back.
///
/// Useful for testing the message flow without any model behind it.
#[derive(Debug, Default)]
pub struct EchoAgent {
    /// Optional prefix to add before the echo.
    prefix: Option<String>,
    sessions_created: AtomicUsize,
}

impl EchoAgent {
    /// Create a new EchoAgent with no prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new EchoAgent with a custom prefix.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mock_agent::EchoAgent;
    ///
    /// let agent = EchoAgent::with_prefix("Echo: ");
    /// // Will reply with "Echo: <prompt>"
    /// ```
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    /// Number of times `create_session` has been called.
    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRuntime for EchoAgent {
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(SessionHandle::new(app_id, user_id, session_id))
    }

    async fn invoke(&self, _session: &SessionHandle, prompt: &str) -> Result<AgentReply, AgentError> {
        let text = match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, prompt),
            None => prompt.to_string(),
        };
        Ok(AgentReply::text(text))
    }

    fn name(&self) -> &str {
        "EchoAgent"
    }

    fn model(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_no_prefix() {
        let agent = EchoAgent::new();
        let session = agent.create_session("app", "+111@x", "+111@x").await.unwrap();

        let reply = agent.invoke(&session, "Hello!").await.unwrap();
        assert_eq!(reply.text, "Hello!");
        assert_eq!(agent.sessions_created(), 1);
    }

    #[tokio::test]
    async fn test_echo_with_prefix() {
        let agent = EchoAgent::with_prefix("Echo: ");
        let session = agent.create_session("app", "+111@x", "+111@x").await.unwrap();

        let reply = agent.invoke(&session, "Hello!").await.unwrap();
        assert_eq!(reply.text, "Echo: Hello!");
    }

    #[tokio::test]
    async fn test_agent_name() {
        let agent = EchoAgent::new();
        assert_eq!(agent.name(), "EchoAgent");
        assert_eq!(agent.model(), "echo");
    }
}
