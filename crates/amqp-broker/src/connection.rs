//! Broker connection lifecycle.

use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, ConfirmSelectOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{BrokerConfig, QueueSpec};
use crate::error::BrokerError;

/// AMQP persistent delivery mode.
const PERSISTENT: u8 = 2;

struct Link {
    connection: Connection,
    channel: Channel,
}

/// Owns the connection and channel to the broker.
///
/// Methods take `&self` so the connection can be shared between the consumer
/// loop and publishers. Publishers look up the current channel on every call,
/// so they keep working across reconnects.
pub struct BrokerConnection {
    config: BrokerConfig,
    link: RwLock<Option<Link>>,
}

impl BrokerConnection {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            link: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Connect, set QoS and declare both queues.
    ///
    /// Never fails: errors are logged and reported as `false`.
    pub async fn connect(&self) -> bool {
        info!("Connecting to broker: {}", self.config.redacted_url());
        match self.open().await {
            Ok(link) => {
                self.replace(link).await;
                info!(
                    "Connected to broker (prefetch={}, inbound={}, outbound={})",
                    self.config.prefetch_count, self.config.inbound.name, self.config.outbound.name
                );
                true
            }
            Err(e) => {
                error!("Failed to connect to broker: {}", e);
                false
            }
        }
    }

    /// Connect, retrying with backoff per the reconnect policy.
    pub async fn connect_with_retry(&self) -> Result<(), BrokerError> {
        let policy = &self.config.reconnect;
        let mut attempts = 0;
        loop {
            if self.connect().await {
                return Ok(());
            }
            if !policy.should_retry(attempts) {
                return Err(BrokerError::RetriesExhausted(attempts + 1));
            }
            let delay = policy.delay_for_attempt(attempts);
            warn!("Retrying broker connection in {:?} (attempt {})", delay, attempts + 1);
            sleep(delay).await;
            attempts += 1;
        }
    }

    /// Check whether both the connection and channel are open.
    pub async fn is_connected(&self) -> bool {
        match self.link.read().await.as_ref() {
            Some(link) => link.connection.status().connected() && link.channel.status().connected(),
            None => false,
        }
    }

    /// The current channel.
    pub async fn channel(&self) -> Result<Channel, BrokerError> {
        match self.link.read().await.as_ref() {
            Some(link) if link.channel.status().connected() => Ok(link.channel.clone()),
            _ => Err(BrokerError::NotConnected),
        }
    }

    /// Start consuming from the inbound queue.
    ///
    /// The queue is asserted passively first so a missing queue fails here
    /// rather than silently creating one without its arguments.
    pub async fn consume(&self, consumer_tag: &str) -> Result<Consumer, BrokerError> {
        let channel = self.channel().await?;
        let inbound = &self.config.inbound;
        channel
            .queue_declare(&inbound.name, passive(), FieldTable::default())
            .await?;
        let consumer = channel
            .basic_consume(
                &inbound.name,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        info!("Consuming from {} as {}", inbound.name, consumer_tag);
        Ok(consumer)
    }

    /// Publish a persistent JSON message to `queue` via the default exchange.
    ///
    /// The queue is asserted passively (never created or modified here).
    pub async fn publish_persistent(
        &self,
        queue: &str,
        message_id: &str,
        body: &[u8],
    ) -> Result<(), BrokerError> {
        let channel = self.channel().await?;
        channel
            .queue_declare(queue, passive(), FieldTable::default())
            .await?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(PERSISTENT)
            .with_message_id(message_id.into());

        let confirmation = channel
            .basic_publish("", queue, BasicPublishOptions::default(), body, properties)
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(BrokerError::NotConfirmed(message_id.to_string()));
        }
        debug!("Published {} to {}", message_id, queue);
        Ok(())
    }

    /// Close the channel, then the connection. Already-closed state is fine.
    pub async fn stop(&self) {
        let Some(link) = self.link.write().await.take() else {
            debug!("Broker connection already stopped");
            return;
        };
        close_link(link).await;
        info!("Broker channel and connection closed");
    }

    async fn open(&self) -> Result<Link, BrokerError> {
        self.config.validate()?;
        let connection = Connection::connect(&self.config.url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        for spec in [&self.config.inbound, &self.config.outbound] {
            if self.config.declare_dead_letter {
                declare_dead_letter(&channel, spec).await?;
            }
            channel
                .queue_declare(
                    &spec.name,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    spec.arguments(),
                )
                .await?;
            debug!("Declared queue {} (ttl={:?}, dlx={})", spec.name, spec.message_ttl, spec.dead_letter_exchange);
        }

        Ok(Link {
            connection,
            channel,
        })
    }

    async fn replace(&self, link: Link) {
        let previous = self.link.write().await.replace(link);
        if let Some(previous) = previous {
            close_link(previous).await;
        }
    }
}

fn passive() -> QueueDeclareOptions {
    QueueDeclareOptions {
        passive: true,
        durable: true,
        ..Default::default()
    }
}

async fn declare_dead_letter(channel: &Channel, spec: &QueueSpec) -> Result<(), BrokerError> {
    let dead_queue = spec.dead_letter_queue();
    channel
        .exchange_declare(
            &spec.dead_letter_exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_declare(
            &dead_queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            &dead_queue,
            &spec.dead_letter_exchange,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

async fn close_link(link: Link) {
    if link.channel.status().connected() {
        if let Err(e) = link.channel.close(200, "closing").await {
            warn!("Error closing channel: {}", e);
        }
    }
    if link.connection.status().connected() {
        if let Err(e) = link.connection.close(200, "closing").await {
            warn!("Error closing connection: {}", e);
        }
    }
}
