//! Azure OpenAI-based agent runtime.
//!
//! This crate provides an [`AgentRuntime`] that answers prompts with an
//! Azure OpenAI chat-completions deployment.
//!
//! # Features
//!
//! - Per-session conversation history with LRU eviction
//! - Optional system prompt from env or a prompt file
//! - Configurable via environment variables
//!
//! # Usage
//!
//! ```rust,no_run
//! use azure_agent::AzureAgent;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = AzureAgent::from_env()?;
//!     // Hand the agent to the dispatcher...
//!     Ok(())
//! }
//! ```

mod agent;
mod api_types;
mod config;
mod history;

pub use agent::AzureAgent;
pub use config::{AzureAgentConfig, AzureAgentConfigBuilder, DEFAULT_PROMPT_FILE};
pub use history::{HistoryMessage, SessionHistory};

// Re-export agent-core types for convenience
pub use agent_core::{async_trait, AgentError, AgentReply, AgentRuntime, SessionHandle};
