//! Tracking agent implementation - records how invocations overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use agent_core::{async_trait, AgentError, AgentReply, AgentRuntime, SessionHandle};

/// An agent that wraps another agent and records concurrency.
///
/// Keeps the current and peak number of in-flight invocations, and the
/// order in which invocations started, as `(session_id, prompt)` pairs.
pub struct TrackingAgent<R: AgentRuntime> {
    inner: R,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: Mutex<Vec<(String, String)>>,
}

impl<R: AgentRuntime> TrackingAgent<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Invocations running right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous invocations seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Invocations in the order they started.
    pub fn started(&self) -> Vec<(String, String)> {
        self.started.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

/// Decrements the in-flight count even if the inner agent panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<R: AgentRuntime> AgentRuntime for TrackingAgent<R> {
    async fn create_session(
        &self,
        app_id: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionHandle, AgentError> {
        self.inner.create_session(app_id, user_id, session_id).await
    }

    async fn invoke(&self, session: &SessionHandle, prompt: &str) -> Result<AgentReply, AgentError> {
        if let Ok(mut log) = self.started.lock() {
            log.push((session.session_id().to_string(), prompt.to_string()));
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        self.inner.invoke(session, prompt).await
    }

    fn name(&self) -> &str {
        "TrackingAgent"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DelayedAgent, EchoAgent};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_peak_counts_overlap() {
        let agent = Arc::new(TrackingAgent::new(DelayedAgent::with_millis(
            EchoAgent::new(),
            50,
        )));

        let mut handles = Vec::new();
        for i in 0..3 {
            let agent = agent.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("s{}", i);
                let session = agent.create_session("app", &id, &id).await.unwrap();
                agent.invoke(&session, "x").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(agent.peak(), 3);
        assert_eq!(agent.in_flight(), 0);
        assert_eq!(agent.started().len(), 3);
    }
}
