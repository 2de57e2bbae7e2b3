//! Error types for amqp-broker.

use thiserror::Error;

/// Errors that can occur when talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Protocol or I/O error from the AMQP client.
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// No open channel; `connect` has not succeeded or `stop` was called.
    #[error("not connected to broker")]
    NotConnected,

    /// The broker did not confirm a publish.
    #[error("publish not confirmed for message {0}")]
    NotConfirmed(String),

    /// Reconnection gave up after the configured number of attempts.
    #[error("gave up reconnecting after {0} attempts")]
    RetriesExhausted(u32),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
