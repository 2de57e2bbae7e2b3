//! Error types for message dispatch.

use std::time::Duration;

use agent_core::AgentError;
use amqp_broker::BrokerError;
use thiserror::Error;

/// Errors that can occur while handling one delivery.
///
/// Decode errors reject the delivery. Agent and timeout errors become error
/// responses. Transport errors are logged only. Unexpected errors requeue.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The delivery body is not a valid request. Permanent.
    #[error("invalid request payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The agent failed to create a session or answer.
    #[error("{0}")]
    Agent(#[from] AgentError),

    /// The agent did not answer in time.
    #[error("agent invocation timed out after {0:?}")]
    Timeout(Duration),

    /// Broker I/O failed.
    #[error("broker error: {0}")]
    Transport(#[from] BrokerError),

    /// The processing task died (panicked or was aborted).
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}
