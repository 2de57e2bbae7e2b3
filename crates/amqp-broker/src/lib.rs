//! RabbitMQ client plumbing for the queue worker.
//!
//! This crate owns the broker side of the pipeline:
//!
//! - Opening a connection and channel with a prefetch (QoS) limit
//! - Declaring durable inbound/outbound queues with TTL and dead-letter routing
//! - Reconnecting with exponential backoff
//! - Publishing persistent messages and closing cleanly
//!
//! # Example
//!
//! ```no_run
//! use amqp_broker::{BrokerConfig, BrokerConnection};
//!
//! # async fn example() -> Result<(), amqp_broker::BrokerError> {
//! let broker = BrokerConnection::new(BrokerConfig::default());
//! if !broker.connect().await {
//!     return Ok(());
//! }
//!
//! broker
//!     .publish_persistent("wb_queue", "resp-m1", br#"{"status":"success"}"#)
//!     .await?;
//!
//! broker.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod reconnect;

pub use config::{BrokerConfig, QueueSpec};
pub use connection::BrokerConnection;
pub use error::BrokerError;
pub use reconnect::ReconnectConfig;

// Re-export the lapin types callers need to handle deliveries
pub use lapin::message::Delivery;
pub use lapin::Consumer;
