//! Queue dispatch for conversational agents.
//!
//! This crate turns broker deliveries into agent invocations and agent
//! replies into outbound messages:
//!
//! - [`Dispatcher`] - decodes a delivery, routes it to its conversation's
//!   session, invokes the agent under a concurrency limit, publishes the
//!   response and settles the delivery
//! - [`SessionRegistry`] - one session per conversation key, created lazily
//! - [`ResponsePublisher`] - where responses go ([`AmqpResponsePublisher`]
//!   in production, [`memory::RecordingPublisher`] in tests)
//! - [`Dispatcher::run_with_shutdown`] - the consume loop
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use amqp_broker::{BrokerConfig, BrokerConnection};
//! use mock_agent::EchoAgent;
//! use queue_dispatcher::{AmqpResponsePublisher, Dispatcher, DispatcherConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let broker = Arc::new(BrokerConnection::new(BrokerConfig::default()));
//! broker.connect_with_retry().await?;
//!
//! let publisher = Arc::new(AmqpResponsePublisher::outbound(broker.clone()));
//! let dispatcher = Dispatcher::new(Arc::new(EchoAgent::new()), publisher, DispatcherConfig::default());
//!
//! let consumer = broker.consume("agent-worker").await?;
//! dispatcher
//!     .run_with_shutdown(consumer, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! broker.stop().await;
//! # Ok(())
//! # }
//! ```

mod ack;
mod consumer;
mod dispatcher;
mod error;
pub mod memory;
mod prompt;
mod publisher;
mod session;

pub use ack::{DeliveryAcker, IncomingDelivery};
pub use consumer::StopReason;
pub use dispatcher::{
    DeliveryOutcome, Dispatcher, DispatcherConfig, DispatcherStats, ERROR_REPLY,
};
pub use error::DispatchError;
pub use prompt::{build_prompt, HISTORY_WINDOW};
pub use publisher::{AmqpResponsePublisher, ResponsePublisher};
pub use session::{ConversationSession, SessionInfo, SessionRegistry, SessionStats};
