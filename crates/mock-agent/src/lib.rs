//! Stub agent runtimes for exercising the queue worker.
//!
//! This crate provides mock implementations of the `AgentRuntime` trait:
//! - `EchoAgent` - Echoes the prompt back
//! - `ScriptedAgent` - Answers from a fixed event script
//! - `FailingAgent` - Fails (or panics) on purpose
//! - `DelayedAgent` - Wraps another agent with artificial latency
//! - `TrackingAgent` - Wraps another agent and records concurrency
//!
//! For production processing, use the `azure-agent` crate instead.
//!
//! # Example
//!
//! ```rust
//! use mock_agent::{AgentRuntime, EchoAgent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_agent::AgentError> {
//!     let agent = EchoAgent::new();
//!     let session = agent.create_session("app", "+111@x", "+111@x").await?;
//!
//!     let reply = agent.invoke(&session, "Hello!").await?;
//!     println!("Reply: {}", reply.text);
//!     Ok(())
//! }
//! ```

mod delayed;
mod echo;
mod failing;
mod scripted;
mod tracking;

// Re-export agent-core types for convenience
pub use agent_core::{async_trait, AgentError, AgentEvent, AgentReply, AgentRuntime, SessionHandle};

pub use delayed::DelayedAgent;
pub use echo::EchoAgent;
pub use failing::{FailingAgent, FailureMode};
pub use scripted::ScriptedAgent;
pub use tracking::TrackingAgent;
