//! A shared agent runtime that is built on first use.

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::AgentError;
use crate::trait_def::{AgentReply, AgentRuntime, SessionHandle};

/// One explicitly-owned runtime per process, constructed lazily.
///
/// The factory runs at most once to completion: concurrent first callers
/// wait on the same initialization, and only that single writer stores the
/// runtime. If the factory fails, the cell stays empty and the next call
/// tries again.
pub struct LazyRuntime<R, F> {
    label: String,
    factory: F,
    cell: OnceCell<R>,
}

impl<R, F, Fut> LazyRuntime<R, F>
where
    R: AgentRuntime,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, AgentError>> + Send,
{
    /// Wrap a factory. `label` is reported as the runtime name.
    pub fn new(label: impl Into<String>, factory: F) -> Self {
        Self {
            label: label.into(),
            factory,
            cell: OnceCell::new(),
        }
    }

    /// Get the runtime, building it if this is the first call.
    pub async fn get(&self) -> Result<&R, AgentError> {
        self.cell
            .get_or_try_init(|| async {
                info!("Initializing agent runtime: {}", self.label);
                (self.factory)().await
            })
            .await
    }

    /// Whether the runtime has been built yet.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl<R, F, Fut> AgentRuntime for LazyRuntime<R, F>
where
    R: AgentRuntime,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, AgentError>> + Send,
{
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        self.get()
            .await?
            .create_session(app_id, user_id, session_id)
            .await
    }

    async fn invoke(&self, session: &SessionHandle, prompt: &str) -> Result<AgentReply, AgentError> {
        self.get().await?.invoke(session, prompt).await
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn model(&self) -> &str {
        self.cell.get().map(|r| r.model()).unwrap_or("unknown")
    }

    async fn release_session(&self, session: &SessionHandle) {
        if let Some(runtime) = self.cell.get() {
            runtime.release_session(session).await;
        }
    }

    async fn shutdown(&self) -> Result<(), AgentError> {
        match self.cell.get() {
            Some(runtime) => runtime.shutdown().await,
            None => Ok(()),
        }
    }
}
