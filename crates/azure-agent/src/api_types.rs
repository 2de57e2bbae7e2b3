//! Azure OpenAI chat-completions request and response types.

use agent_core::{AgentEvent, ContentPart};
use serde::{Deserialize, Serialize};

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request body. The deployment is part of the URL, so
/// no model field is sent.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Translate the completion into agent events.
    ///
    /// Only the first choice is considered; `n` is never set above one.
    pub fn into_events(self) -> Vec<AgentEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.into_iter().next() {
            let mut parts: Vec<ContentPart> = choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| ContentPart::FunctionCall {
                    name: call.function.name,
                })
                .collect();
            if let Some(content) = choice.message.content {
                parts.push(ContentPart::Text(content));
            }
            events.push(AgentEvent::Content { parts });
        }

        if let Some(usage) = self.usage {
            events.push(AgentEvent::Usage {
                total_tokens: usage.total_tokens,
            });
        }

        events
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// Response message (content is null when the model only calls tools).
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetails {
    pub message: String,
    pub code: Option<String>,
}
