//! Agent worker: consumes conversational requests from RabbitMQ and answers
//! them with an agent runtime.
//!
//! Configuration comes from the environment (and `.env`); see
//! [`config::WorkerConfig::from_env`]. Set `AGENT_MOCK=true` to run with an
//! echo agent and no model credentials.

mod config;

use std::process;
use std::sync::Arc;

use agent_core::{AgentRuntime, LazyRuntime};
use amqp_broker::BrokerConnection;
use azure_agent::AzureAgent;
use mock_agent::EchoAgent;
use queue_dispatcher::{AmqpResponsePublisher, Dispatcher};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, WorkerConfig};

const CONSUMER_TAG: &str = "agent-worker";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::MissingVars(vars)) => {
            error!("Missing required environment variables: {}", vars.join(", "));
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    config.broker.validate()?;

    info!(
        "Starting agent worker v{} (broker={}, inbound={}, outbound={})",
        env!("CARGO_PKG_VERSION"),
        config.broker.redacted_url(),
        config.broker.inbound.name,
        config.broker.outbound.name
    );

    let agent = build_agent(&config);
    let broker = Arc::new(BrokerConnection::new(config.broker.clone()));
    let publisher = Arc::new(AmqpResponsePublisher::outbound(broker.clone()));
    let dispatcher = Dispatcher::new(agent.clone(), publisher, config.dispatcher.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let result = consume_until_shutdown(&broker, &dispatcher, shutdown_rx).await;

    broker.stop().await;
    if let Err(e) = agent.shutdown().await {
        warn!("Error during agent shutdown: {}", e);
    }

    match result {
        Ok(()) => {
            info!("Agent worker stopped");
            Ok(())
        }
        Err(e) => {
            error!("Agent worker stopped: {}", e);
            Err(e)
        }
    }
}

fn build_agent(config: &WorkerConfig) -> Arc<dyn AgentRuntime> {
    if config.mock_agent {
        info!("AGENT_MOCK set, answering with EchoAgent");
        Arc::new(EchoAgent::new())
    } else {
        Arc::new(LazyRuntime::new("AzureAgent", || async {
            AzureAgent::from_env()
        }))
    }
}

/// Connect, consume, and reconnect whenever the consumer stops, until the
/// shutdown flag is raised.
async fn consume_until_shutdown(
    broker: &BrokerConnection,
    dispatcher: &Dispatcher,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let retry_delay = broker.config().reconnect.initial_delay;

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        tokio::select! {
            result = broker.connect_with_retry() => result?,
            () = wait_for(shutdown.clone()) => return Ok(()),
        }

        let consumer = match broker.consume(CONSUMER_TAG).await {
            Ok(consumer) => consumer,
            Err(e) => {
                error!("Failed to start consumer: {}", e);
                sleep(retry_delay).await;
                continue;
            }
        };

        let reason = dispatcher
            .run_with_shutdown(consumer, wait_for(shutdown.clone()))
            .await;
        if !reason.should_reconnect() {
            return Ok(());
        }
        warn!("Consumer stopped ({:?}), reconnecting", reason);
    }
}

/// Resolves once the shutdown flag is raised (or its sender is gone).
async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
    info!("Shutting down: draining in-flight messages");
}
