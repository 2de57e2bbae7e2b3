//! Error types for agent operations.

use thiserror::Error;

/// Errors that can occur while creating sessions or invoking an agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent runtime is temporarily unavailable.
    #[error("agent unavailable: {0}")]
    Unavailable(String),

    /// The prompt could not be processed.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// The runtime is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A network call to the model provider failed.
    #[error("network error: {0}")]
    Network(String),

    /// The invocation did not finish in time.
    #[error("processing timed out")]
    Timeout,

    /// The runtime has been shut down.
    #[error("agent shut down")]
    ShutDown,
}
