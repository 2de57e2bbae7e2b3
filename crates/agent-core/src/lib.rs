//! Core trait and types for agent runtimes.
//!
//! This crate provides the shared interface between the queue worker and
//! whatever language-model agent answers conversations. It defines:
//!
//! - [`AgentRuntime`] - The trait every agent adapter implements
//! - [`InboundRequest`] / [`OutboundResponse`] - Queue wire types
//! - [`AgentEvent`] - The closed set of event shapes an adapter may see,
//!   plus [`extract_reply`] to collapse them into one text answer
//! - [`LazyRuntime`] - A lazily-initialized shared runtime
//! - [`AgentError`] - Error types for agent operations
//!
//! # Example
//!
//! ```rust
//! use agent_core::{async_trait, AgentError, AgentReply, AgentRuntime, SessionHandle};
//!
//! struct MyAgent;
//!
//! #[async_trait]
//! impl AgentRuntime for MyAgent {
//!     async fn create_session(
//!         &self,
//!         app_id: &str,
//!         user_id: &str,
//!         session_id: &str,
//!     ) -> Result<SessionHandle, AgentError> {
//!         Ok(SessionHandle::new(app_id, user_id, session_id))
//!     }
//!
//!     async fn invoke(&self, _session: &SessionHandle, _prompt: &str) -> Result<AgentReply, AgentError> {
//!         Ok(AgentReply::text("Hello!"))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "MyAgent"
//!     }
//! }
//! ```

mod error;
mod events;
mod lazy;
mod message;
mod trait_def;

pub use error::AgentError;
pub use events::{extract_reply, AgentEvent, ContentPart, FALLBACK_REPLY};
pub use lazy::LazyRuntime;
pub use message::{
    AgentMetadata, Contact, ConversationContext, HistoryEntry, InboundRequest, MessageBody,
    OutboundResponse, ResponseBody, ResponseError, ResponseStatus, PROCESSING_ERROR, UNKNOWN,
};
pub use trait_def::{AgentReply, AgentRuntime, SessionHandle};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
