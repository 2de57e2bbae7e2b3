//! Publishing responses to the outbound queue.

use std::sync::Arc;

use agent_core::{async_trait, OutboundResponse};
use amqp_broker::BrokerConnection;
use tracing::info;

use crate::error::DispatchError;

/// Sends an [`OutboundResponse`] downstream.
#[async_trait]
pub trait ResponsePublisher: Send + Sync {
    async fn publish(&self, response: &OutboundResponse) -> Result<(), DispatchError>;
}

/// Publishes responses as persistent JSON messages on an AMQP queue.
///
/// The AMQP message id is the response's `messageId`, so consumers can
/// dedupe redelivered replies.
pub struct AmqpResponsePublisher {
    broker: Arc<BrokerConnection>,
    queue: String,
}

impl AmqpResponsePublisher {
    pub fn new(broker: Arc<BrokerConnection>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
        }
    }

    /// Publish to the broker's configured outbound queue.
    pub fn outbound(broker: Arc<BrokerConnection>) -> Self {
        let queue = broker.config().outbound.name.clone();
        Self::new(broker, queue)
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}

#[async_trait]
impl ResponsePublisher for AmqpResponsePublisher {
    async fn publish(&self, response: &OutboundResponse) -> Result<(), DispatchError> {
        let body = serde_json::to_vec(response)
            .map_err(|e| DispatchError::Unexpected(format!("failed to encode response: {}", e)))?;

        self.broker
            .publish_persistent(&self.queue, &response.message_id, &body)
            .await?;

        info!(
            message_id = %response.message_id,
            queue = %self.queue,
            "Published response"
        );
        Ok(())
    }
}
