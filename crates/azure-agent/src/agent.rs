//! AzureAgent implementation using the Azure OpenAI REST API.

use std::sync::atomic::{AtomicBool, Ordering};

use agent_core::{
    async_trait, extract_reply, AgentError, AgentReply, AgentRuntime, SessionHandle,
};
use reqwest::Client;
use tracing::{debug, info};

use crate::api_types::{ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::AzureAgentConfig;
use crate::history::SessionHistory;

/// An agent runtime backed by an Azure OpenAI chat deployment.
///
/// Sessions are history buckets keyed by session id; every invocation sends
/// the system prompt, the session's recent turns and the new prompt.
pub struct AzureAgent {
    client: Client,
    config: AzureAgentConfig,
    history: SessionHistory,
    model: String,
    closed: AtomicBool,
}

impl AzureAgent {
    /// Create a new AzureAgent with the given configuration.
    pub fn new(config: AzureAgentConfig) -> Result<Self, AgentError> {
        if config.endpoint.is_empty() || config.api_key.is_empty() {
            return Err(AgentError::Configuration(
                "endpoint and api key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AgentError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let history = SessionHistory::new(config.max_history_turns);
        let model = config.model_name();

        info!(
            "AzureAgent initialized with deployment: {}, api version: {}",
            config.deployment, config.api_version
        );

        Ok(Self {
            client,
            config,
            history,
            model,
            closed: AtomicBool::new(false),
        })
    }

    /// Create an AzureAgent from environment variables.
    ///
    /// See [`AzureAgentConfig::from_env`] for the variables read.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::new(AzureAgentConfig::from_env()?)
    }

    pub fn config(&self) -> &AzureAgentConfig {
        &self.config
    }

    /// Build the messages array for a chat completion request.
    async fn build_messages(&self, session_id: &str, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::new();

        if let Some(ref system_prompt) = self.config.system_prompt {
            messages.push(ChatMessage::system(system_prompt.clone()));
        }

        for msg in self.history.get(session_id).await {
            messages.push(ChatMessage {
                role: msg.role,
                content: msg.content,
            });
        }

        messages.push(ChatMessage::user(prompt));
        messages
    }

    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatCompletionResponse, AgentError> {
        let request = ChatCompletionRequest {
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to Azure OpenAI: {:?}", request);

        let response = self
            .client
            .post(self.config.chat_completions_url())
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout
                } else {
                    AgentError::Network(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiError>(&error_text)
                .map(|api_error| api_error.error.message)
                .unwrap_or(error_text);

            if status.as_u16() == 429 || status.is_server_error() {
                return Err(AgentError::Unavailable(format!(
                    "API error ({}): {}",
                    status.as_u16(),
                    detail
                )));
            }
            return Err(AgentError::ProcessingFailed(format!(
                "API error ({}): {}",
                status.as_u16(),
                detail
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::ProcessingFailed(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl AgentRuntime for AzureAgent {
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        self.history.open(session_id).await;
        debug!("Opened session {} for {} in {}", session_id, user_id, app_id);
        Ok(SessionHandle::new(app_id, user_id, session_id))
    }

    async fn invoke(&self, session: &SessionHandle, prompt: &str) -> Result<AgentReply, AgentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AgentError::ShutDown);
        }
        let session_id = session.session_id();
        let messages = self.build_messages(session_id, prompt).await;

        let completion = self.chat_completion(messages).await?;
        let reply = extract_reply(completion.into_events());

        self.history
            .add_exchange(session_id, prompt, &reply.text)
            .await;

        if let Some(tokens) = reply.tokens_used {
            debug!("Session {} used {} tokens", session_id, tokens);
        }

        Ok(reply)
    }

    fn name(&self) -> &str {
        "AzureAgent"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn release_session(&self, session: &SessionHandle) {
        self.history.clear(session.session_id()).await;
    }

    async fn shutdown(&self) -> Result<(), AgentError> {
        self.closed.store(true, Ordering::SeqCst);
        self.history.clear_all().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AzureAgentConfig {
        AzureAgentConfig::builder()
            .endpoint("https://res.openai.azure.com")
            .api_key("test-key")
            .deployment("gpt-4o-mini")
            .build()
    }

    #[test]
    fn test_new_requires_credentials() {
        let config = AzureAgentConfig::builder().api_key("k").build();
        assert!(matches!(
            AzureAgent::new(config),
            Err(AgentError::Configuration(_))
        ));
    }

    #[test]
    fn test_agent_name_and_model() {
        let agent = AzureAgent::new(test_config()).unwrap();
        assert_eq!(agent.name(), "AzureAgent");
        assert_eq!(agent.model(), "azure/gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_build_messages_includes_system_and_history() {
        let config = AzureAgentConfig::builder()
            .endpoint("https://res.openai.azure.com")
            .api_key("test-key")
            .system_prompt("You take bookings.")
            .build();
        let agent = AzureAgent::new(config).unwrap();

        let session = agent.create_session("booking_agent", "+111@x", "+111@x").await.unwrap();
        agent
            .history
            .add_exchange(session.session_id(), "Hi", "Hello!")
            .await;

        let messages = agent.build_messages("+111@x", "Table for two").await;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "Hi");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].content, "Table for two");
    }

    #[tokio::test]
    async fn test_release_session_clears_history() {
        let agent = AzureAgent::new(test_config()).unwrap();
        let session = agent.create_session("app", "+111@x", "+111@x").await.unwrap();
        agent.history.add_exchange("+111@x", "Hi", "Hello").await;

        agent.release_session(&session).await;
        assert!(agent.history.get("+111@x").await.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_after_shutdown() {
        let agent = AzureAgent::new(test_config()).unwrap();
        let session = agent.create_session("app", "+111@x", "+111@x").await.unwrap();

        agent.shutdown().await.unwrap();
        assert!(matches!(
            agent.invoke(&session, "hi").await,
            Err(AgentError::ShutDown)
        ));
    }
}
