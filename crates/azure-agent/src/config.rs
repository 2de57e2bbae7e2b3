//! Configuration for AzureAgent.

use std::env;
use std::path::Path;
use std::time::Duration;

use agent_core::AgentError;

/// Default system prompt file name.
pub const DEFAULT_PROMPT_FILE: &str = "SYSTEM_PROMPT.md";

const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";
const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Configuration for AzureAgent.
#[derive(Debug, Clone)]
pub struct AzureAgentConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,

    /// API key sent in the `api-key` header.
    pub api_key: String,

    /// Deployment (model) name.
    pub deployment: String,

    /// REST API version query parameter.
    pub api_version: String,

    /// Optional system prompt.
    pub system_prompt: Option<String>,

    /// Maximum tokens for response.
    pub max_tokens: Option<u32>,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum number of conversation turns to keep per session.
    pub max_history_turns: usize,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl Default for AzureAgentConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: DEFAULT_DEPLOYMENT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            system_prompt: None,
            max_tokens: Some(1024),
            temperature: Some(0.7),
            max_history_turns: 10,
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl AzureAgentConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `AZURE_OPENAI_ENDPOINT` - Resource endpoint
    /// - `AZURE_OPENAI_API_KEY` - API key
    ///
    /// Optional environment variables:
    /// - `AZURE_OPENAI_DEPLOYMENT_NAME` - Deployment name (default: gpt-4o-mini)
    /// - `AZURE_OPENAI_API_VERSION` - API version (default: 2024-02-15-preview)
    /// - `AGENT_SYSTEM_PROMPT` - System prompt (overrides prompt file)
    /// - `AGENT_PROMPT_FILE` - Path to system prompt file (default: SYSTEM_PROMPT.md)
    /// - `AGENT_MAX_TOKENS` - Max tokens (default: 1024)
    /// - `AGENT_TEMPERATURE` - Temperature (default: 0.7)
    /// - `AGENT_MAX_HISTORY_TURNS` - Max history turns (default: 10)
    /// - `AGENT_REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 90)
    pub fn from_env() -> Result<Self, AgentError> {
        let endpoint = env::var("AZURE_OPENAI_ENDPOINT").map_err(|_| {
            AgentError::Configuration("AZURE_OPENAI_ENDPOINT not set".to_string())
        })?;

        let api_key = env::var("AZURE_OPENAI_API_KEY").map_err(|_| {
            AgentError::Configuration("AZURE_OPENAI_API_KEY not set".to_string())
        })?;

        let deployment = env::var("AZURE_OPENAI_DEPLOYMENT_NAME")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());

        let api_version = env::var("AZURE_OPENAI_API_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        // System prompt: env var takes precedence, then try loading from file
        let system_prompt = if let Ok(prompt) = env::var("AGENT_SYSTEM_PROMPT") {
            Some(prompt)
        } else {
            let prompt_file = env::var("AGENT_PROMPT_FILE")
                .unwrap_or_else(|_| DEFAULT_PROMPT_FILE.to_string());
            load_prompt_file(&prompt_file)
        };

        let max_tokens = env::var("AGENT_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(1024));

        let temperature = env::var("AGENT_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(0.7));

        let max_history_turns = env::var("AGENT_MAX_HISTORY_TURNS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let request_timeout = env::var("AGENT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(90));

        Ok(Self {
            endpoint,
            api_key,
            deployment,
            api_version,
            system_prompt,
            max_tokens,
            temperature,
            max_history_turns,
            request_timeout,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> AzureAgentConfigBuilder {
        AzureAgentConfigBuilder::default()
    }

    /// Chat-completions URL for the configured deployment.
    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    /// Model identifier reported in response metadata.
    pub fn model_name(&self) -> String {
        format!("azure/{}", self.deployment)
    }
}

/// Builder for AzureAgentConfig.
#[derive(Debug, Default)]
pub struct AzureAgentConfigBuilder {
    config: AzureAgentConfig,
}

impl AzureAgentConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn deployment(mut self, deployment: impl Into<String>) -> Self {
        self.config.deployment = deployment.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = Some(temp);
        self
    }

    pub fn max_history_turns(mut self, turns: usize) -> Self {
        self.config.max_history_turns = turns;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AzureAgentConfig {
        self.config
    }

    /// Load system prompt from a file.
    ///
    /// If the file exists and is non-empty, sets the system prompt.
    pub fn load_prompt_file(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(prompt) = load_prompt_file(path) {
            self.config.system_prompt = Some(prompt);
        }
        self
    }
}

/// Load a prompt file, returning None if not found or empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let content = std::fs::read_to_string(path.as_ref()).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
