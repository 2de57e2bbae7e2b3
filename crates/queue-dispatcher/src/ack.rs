//! Acknowledgment seam between the dispatcher and the broker.

use agent_core::async_trait;
use amqp_broker::BrokerError;
use lapin::acker::Acker;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions, BasicRejectOptions};

/// Settles one delivery with the broker.
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    /// Processing finished; remove the message from the queue.
    async fn ack(&self) -> Result<(), BrokerError>;

    /// The message can never be processed; drop it (or dead-letter it).
    async fn reject(&self) -> Result<(), BrokerError>;

    /// Processing died unexpectedly; put the message back on the queue.
    async fn requeue(&self) -> Result<(), BrokerError>;
}

#[async_trait]
impl DeliveryAcker for Acker {
    async fn ack(&self) -> Result<(), BrokerError> {
        Acker::ack(self, BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn reject(&self) -> Result<(), BrokerError> {
        Acker::reject(self, BasicRejectOptions { requeue: false }).await?;
        Ok(())
    }

    async fn requeue(&self) -> Result<(), BrokerError> {
        Acker::nack(
            self,
            BasicNackOptions {
                multiple: false,
                requeue: true,
            },
        )
        .await?;
        Ok(())
    }
}

/// Something the consume loop can hand to the dispatcher.
pub trait IncomingDelivery: Send + 'static {
    type Acker: DeliveryAcker + 'static;

    /// Split into the raw body and the handle used to settle it.
    fn into_parts(self) -> (Vec<u8>, Self::Acker);
}

impl IncomingDelivery for Delivery {
    type Acker = Acker;

    fn into_parts(self) -> (Vec<u8>, Acker) {
        (self.data, self.acker)
    }
}
