//! Per-delivery processing: decode, route to a session, invoke, respond, settle.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_core::{AgentMetadata, AgentReply, AgentRuntime, InboundRequest, OutboundResponse};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::ack::DeliveryAcker;
use crate::error::DispatchError;
use crate::prompt::build_prompt;
use crate::publisher::ResponsePublisher;
use crate::session::{SessionRegistry, SessionStats};

/// Text sent to the user when their message could not be answered.
pub const ERROR_REPLY: &str = "I encountered an error processing your request. Please try again.";

/// Default timeout for a single agent invocation (120 seconds).
const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default time to wait for in-flight deliveries on shutdown.
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Application name passed to the agent when creating sessions.
    pub app_name: String,

    /// Maximum number of agent invocations running at once.
    pub max_concurrent: usize,

    /// Timeout for one agent invocation. A timed-out invocation produces an
    /// error response like any other processing failure.
    pub agent_timeout: Duration,

    /// Whether messages of one conversation are answered one at a time, in
    /// arrival order.
    pub serialize_per_session: bool,

    /// How long shutdown waits for in-flight deliveries before aborting them.
    pub drain_timeout: Duration,

    /// Queue names, reported in stats.
    pub inbound_queue: String,
    pub outbound_queue: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            app_name: "booking_agent".to_string(),
            max_concurrent: 5,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            serialize_per_session: true,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            inbound_queue: "ag_queue".to_string(),
            outbound_queue: "wb_queue".to_string(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_agent_timeout(mut self, agent_timeout: Duration) -> Self {
        self.agent_timeout = agent_timeout;
        self
    }

    pub fn with_serialize_per_session(mut self, serialize: bool) -> Self {
        self.serialize_per_session = serialize;
        self
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }
}

/// How a delivery was settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Processed (successfully or not) and acknowledged.
    Acked,
    /// Undecodable; rejected without requeue.
    Rejected,
    /// Processing died unexpectedly; returned to the queue.
    Requeued,
}

/// Snapshot of the dispatcher. For observability only.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStats {
    pub is_running: bool,
    pub max_concurrent: usize,
    pub available_permits: usize,
    pub inbound_queue: String,
    pub outbound_queue: String,
    pub agent: String,
    pub sessions: SessionStats,
}

struct Inner {
    agent: Arc<dyn AgentRuntime>,
    publisher: Arc<dyn ResponsePublisher>,
    sessions: SessionRegistry,
    permits: Semaphore,
    config: DispatcherConfig,
    running: AtomicBool,
}

/// Routes deliveries to agent sessions and publishes the replies.
///
/// Cheap to clone; clones share sessions, permits and the publisher.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(
        agent: Arc<dyn AgentRuntime>,
        publisher: Arc<dyn ResponsePublisher>,
        config: DispatcherConfig,
    ) -> Self {
        // A zero-sized semaphore would never admit a delivery
        let permits = Semaphore::new(config.max_concurrent.max(1));
        let sessions = SessionRegistry::new(agent.clone(), config.app_name.clone());
        Self {
            inner: Arc::new(Inner {
                agent,
                publisher,
                sessions,
                permits,
                config,
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// Number of agent invocations allowed at once (at least one).
    pub fn max_concurrent(&self) -> usize {
        self.inner.config.max_concurrent.max(1)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn agent(&self) -> &Arc<dyn AgentRuntime> {
        &self.inner.agent
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::SeqCst);
    }

    pub async fn stats(&self) -> DispatcherStats {
        let config = &self.inner.config;
        DispatcherStats {
            is_running: self.is_running(),
            max_concurrent: self.max_concurrent(),
            available_permits: self.inner.permits.available_permits(),
            inbound_queue: config.inbound_queue.clone(),
            outbound_queue: config.outbound_queue.clone(),
            agent: self.inner.agent.name().to_string(),
            sessions: self.inner.sessions.stats().await,
        }
    }

    /// Handle one delivery from start to settlement.
    ///
    /// Exactly one of ack, reject or requeue is sent through `acker`. All
    /// processing runs inside this future: dropping it (for example when a
    /// drain times out) cancels the invocation, releases its permit and
    /// publishes nothing.
    pub async fn handle_delivery<A: DeliveryAcker>(&self, body: &[u8], acker: A) -> DeliveryOutcome {
        let request = match InboundRequest::from_slice(body) {
            Ok(request) => request,
            Err(e) => {
                let err = DispatchError::from(e);
                warn!("Rejecting delivery: {}", err);
                return settle(&acker, DeliveryOutcome::Rejected).await;
            }
        };

        info!(
            message_id = %request.message_id,
            remote_jid = %request.remote_jid(),
            "Processing message"
        );

        let message_id = request.message_id.clone();
        let outcome = match AssertUnwindSafe(self.process(request)).catch_unwind().await {
            Ok(()) => DeliveryOutcome::Acked,
            Err(panic) => {
                let err = DispatchError::Unexpected(panic_message(&panic));
                error!(message_id = %message_id, "Requeueing delivery: {}", err);
                DeliveryOutcome::Requeued
            }
        };
        settle(&acker, outcome).await
    }

    /// Answer `request` and publish the response. Publish failures are logged.
    async fn process(&self, request: InboundRequest) {
        let response = self.respond(&request).await;
        match self.inner.publisher.publish(&response).await {
            Ok(()) => debug!(
                message_id = %response.message_id,
                status = ?response.status,
                "Response published"
            ),
            Err(e) => error!(
                message_id = %response.message_id,
                "Failed to publish response: {}", e
            ),
        }
    }

    /// Build the response for a decoded request.
    ///
    /// Never fails: processing errors become an error response.
    pub async fn respond(&self, request: &InboundRequest) -> OutboundResponse {
        let started = Instant::now();
        let agent = &self.inner.agent;

        match self.answer(request).await {
            Ok(reply) => {
                let tokens_used = reply.tokens_used.unwrap_or_else(|| word_count(&reply.text));
                let metadata = AgentMetadata {
                    session_id: request.remote_jid().to_string(),
                    tools_used: reply.tools_used,
                    reasoning_steps: vec![format!("Processed with {}", agent.name())],
                    processing_time: started.elapsed().as_secs_f64(),
                    tokens_used,
                    model: agent.model().to_string(),
                };
                OutboundResponse::success(request, reply.text, metadata)
            }
            Err(e) => {
                error!(
                    message_id = %request.message_id,
                    remote_jid = %request.remote_jid(),
                    "Failed to process message: {}", e
                );
                let metadata = AgentMetadata {
                    session_id: request.remote_jid().to_string(),
                    processing_time: started.elapsed().as_secs_f64(),
                    model: agent.model().to_string(),
                    ..Default::default()
                };
                OutboundResponse::failure(request, ERROR_REPLY, e.to_string(), metadata)
            }
        }
    }

    async fn answer(&self, request: &InboundRequest) -> Result<AgentReply, DispatchError> {
        let remote_jid = request.remote_jid();
        let session = self.inner.sessions.get_or_create(remote_jid).await?;

        let _turn = if self.inner.config.serialize_per_session {
            Some(session.lock_turn().await)
        } else {
            None
        };

        // Taken after the turn so queued messages of a busy conversation
        // do not hold permits other conversations could use
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| DispatchError::Unexpected("dispatcher permits closed".to_string()))?;

        let count = session.increment();
        debug!(remote_jid = %remote_jid, message_count = count, "Session turn");

        let prompt = build_prompt(request);
        let limit = self.inner.config.agent_timeout;
        match timeout(limit, self.inner.agent.invoke(session.handle(), &prompt)).await {
            Ok(reply) => Ok(reply?),
            Err(_elapsed) => Err(DispatchError::Timeout(limit)),
        }
    }
}

async fn settle<A: DeliveryAcker>(acker: &A, outcome: DeliveryOutcome) -> DeliveryOutcome {
    let result = match outcome {
        DeliveryOutcome::Acked => acker.ack().await,
        DeliveryOutcome::Rejected => acker.reject().await,
        DeliveryOutcome::Requeued => acker.requeue().await,
    };
    if let Err(e) = result {
        error!("Failed to settle delivery ({:?}): {}", outcome, e);
    }
    outcome
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("processing panicked")
        .to_string()
}

fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}
