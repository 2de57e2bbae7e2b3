//! Scripted agent implementation - replays a fixed event sequence.

use agent_core::{
    async_trait, extract_reply, AgentError, AgentEvent, AgentReply, AgentRuntime, SessionHandle,
};

/// An agent that answers every prompt by replaying the same events.
///
/// The events go through [`extract_reply`], so a script can exercise the
/// same extraction path a real runner would.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    events: Vec<AgentEvent>,
}

impl ScriptedAgent {
    /// Answer with the given events.
    pub fn new(events: Vec<AgentEvent>) -> Self {
        Self { events }
    }

    /// Answer with a single data event carrying `text`.
    pub fn reply(text: impl Into<String>) -> Self {
        Self::new(vec![AgentEvent::Data { text: text.into() }])
    }
}

#[async_trait]
impl AgentRuntime for ScriptedAgent {
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        Ok(SessionHandle::new(app_id, user_id, session_id))
    }

    async fn invoke(&self, _session: &SessionHandle, _prompt: &str) -> Result<AgentReply, AgentError> {
        Ok(extract_reply(self.events.clone()))
    }

    fn name(&self) -> &str {
        "ScriptedAgent"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
