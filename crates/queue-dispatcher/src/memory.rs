//! In-memory publisher and acker, for tests and local runs without a broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use agent_core::{async_trait, OutboundResponse};
use amqp_broker::BrokerError;

use crate::ack::{DeliveryAcker, IncomingDelivery};
use crate::error::DispatchError;
use crate::publisher::ResponsePublisher;

/// Collects published responses instead of sending them anywhere.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<OutboundResponse>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails with a transport error.
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.set_failing(true);
        publisher
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Responses published so far, in publish order.
    pub fn published(&self) -> Vec<OutboundResponse> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.published.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponsePublisher for RecordingPublisher {
    async fn publish(&self, response: &OutboundResponse) -> Result<(), DispatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BrokerError::NotConnected.into());
        }
        if let Ok(mut published) = self.published.lock() {
            published.push(response.clone());
        }
        Ok(())
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckAction {
    Ack,
    Reject,
    Requeue,
}

/// Records how a delivery was settled. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingAcker {
    actions: Arc<Mutex<Vec<AckAction>>>,
}

impl RecordingAcker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every settlement, in order. A well-behaved dispatcher settles once.
    pub fn actions(&self) -> Vec<AckAction> {
        self.actions
            .lock()
            .map(|actions| actions.clone())
            .unwrap_or_default()
    }

    /// The last settlement, if any.
    pub fn last(&self) -> Option<AckAction> {
        self.actions().last().copied()
    }

    fn record(&self, action: AckAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }
}

#[async_trait]
impl DeliveryAcker for RecordingAcker {
    async fn ack(&self) -> Result<(), BrokerError> {
        self.record(AckAction::Ack);
        Ok(())
    }

    async fn reject(&self) -> Result<(), BrokerError> {
        self.record(AckAction::Reject);
        Ok(())
    }

    async fn requeue(&self) -> Result<(), BrokerError> {
        self.record(AckAction::Requeue);
        Ok(())
    }
}

/// A delivery held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDelivery {
    pub body: Vec<u8>,
    pub acker: RecordingAcker,
}

impl MemoryDelivery {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            acker: RecordingAcker::new(),
        }
    }
}

impl IncomingDelivery for MemoryDelivery {
    type Acker = RecordingAcker;

    fn into_parts(self) -> (Vec<u8>, RecordingAcker) {
        (self.body, self.acker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_acker_shares_record() {
        let acker = RecordingAcker::new();
        let handle = acker.clone();

        acker.ack().await.unwrap();
        assert_eq!(handle.actions(), vec![AckAction::Ack]);
        assert_eq!(handle.last(), Some(AckAction::Ack));
    }

    #[tokio::test]
    async fn test_failing_publisher() {
        let publisher = RecordingPublisher::failing();
        let request = agent_core::InboundRequest::from_slice(
            br#"{"messageId":"m1","contact":{"remoteJid":"+111@x"}}"#,
        )
        .unwrap();
        let response = OutboundResponse::success(&request, "hi", Default::default());

        let err = publisher.publish(&response).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(BrokerError::NotConnected)));
        assert!(publisher.is_empty());

        publisher.set_failing(false);
        publisher.publish(&response).await.unwrap();
        assert_eq!(publisher.published()[0].message_id, "resp-m1");
    }
}
