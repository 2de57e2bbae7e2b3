//! The consume loop: pulls deliveries and dispatches each on its own task.

use std::fmt::Display;
use std::future::Future;

use futures::{Stream, StreamExt};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::ack::IncomingDelivery;
use crate::dispatcher::{DeliveryOutcome, Dispatcher};

/// Why [`Dispatcher::run_with_shutdown`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown signal completed.
    Shutdown,
    /// The broker closed the consumer.
    StreamEnded,
    /// The consumer yielded an error (usually a lost channel).
    StreamFailed(String),
}

impl StopReason {
    /// Whether the caller should reconnect and keep consuming.
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, StopReason::Shutdown)
    }
}

impl Dispatcher {
    /// Consume `deliveries` until `shutdown` completes or the stream stops.
    ///
    /// Each delivery is handled on its own task, so up to the broker's
    /// prefetch count can be in flight while the dispatcher's semaphore
    /// bounds agent invocations. On return no new deliveries are pulled and
    /// in-flight ones have been given `drain_timeout` to finish. Any still
    /// running after that are cancelled before they publish, left
    /// unacknowledged, and redelivered by the broker.
    pub async fn run_with_shutdown<S, D, E, F>(&self, mut deliveries: S, shutdown: F) -> StopReason
    where
        S: Stream<Item = Result<D, E>> + Unpin,
        D: IncomingDelivery,
        E: Display,
        F: Future<Output = ()>,
    {
        info!(
            "Starting consumer on {} with agent: {} (max_concurrent={})",
            self.config().inbound_queue,
            self.agent().name(),
            self.max_concurrent()
        );
        self.set_running(true);

        let mut tasks: JoinSet<DeliveryOutcome> = JoinSet::new();
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Shutdown signal received, no longer pulling deliveries");
                    break StopReason::Shutdown;
                }

                Some(finished) = tasks.join_next(), if !tasks.is_empty() => {
                    log_finished(finished);
                }

                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        let (body, acker) = delivery.into_parts();
                        let dispatcher = self.clone();
                        tasks.spawn(async move { dispatcher.handle_delivery(&body, acker).await });
                    }
                    Some(Err(e)) => {
                        error!("Consumer stream error: {}", e);
                        break StopReason::StreamFailed(e.to_string());
                    }
                    None => {
                        warn!("Consumer stream ended");
                        break StopReason::StreamEnded;
                    }
                }
            }
        };

        self.drain(&mut tasks).await;
        self.set_running(false);
        reason
    }

    async fn drain(&self, tasks: &mut JoinSet<DeliveryOutcome>) {
        if tasks.is_empty() {
            return;
        }
        info!("Waiting for {} in-flight deliveries", tasks.len());

        let limit = self.config().drain_timeout;
        let drained = timeout(limit, async {
            while let Some(finished) = tasks.join_next().await {
                log_finished(finished);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                "Aborting {} deliveries still running after {:?}",
                tasks.len(),
                limit
            );
            tasks.shutdown().await;
        }
    }
}

fn log_finished(finished: Result<DeliveryOutcome, tokio::task::JoinError>) {
    match finished {
        Ok(outcome) => debug!("Delivery settled: {:?}", outcome),
        Err(e) => error!("Delivery task failed: {}", e),
    }
}
