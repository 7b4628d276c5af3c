//! # Consumer Lifecycle
//!
//! Starts the delivery loop as a background task and stops it on request.
//!
//! ```text
//! start() ── connect ── declare topology ── consume ──> spawn(loop)
//!                                                         │
//!     ┌──────────── next delivery ◄──────────────────────┤
//!     │                                                   │ connection lost
//!     └──> DeliveryProcessor::process ──> ack / nack      └──> backoff, reconnect
//!
//! stop() ── signal ── wait ≤ shutdown_timeout (abort after) ── close channel, connection
//! ```
//!
//! Startup failures are returned from [`UserRpcConsumer::start`]. Failures
//! after startup end the task; [`ConsumerHandle::join`] and
//! [`ConsumerHandle::stop`] report them.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use validator::Validate;

use super::backoff::ReconnectBackoff;
use super::processor::DeliveryProcessor;
use crate::config::{ConfigurationError, ConsumerConfig};
use crate::constants::topology::CONSUMER_TAG;
use crate::domain::ServiceProvider;
use crate::error::{ConsumerError, Result};
use crate::messaging::service::DeliveryStream;
use crate::messaging::{BrokerConnector, BrokerProvider, MessagingError, Topology};

type TransportSlot = Arc<Mutex<Option<Arc<BrokerProvider>>>>;

/// A connected transport and its running consumer
struct Session {
    transport: Arc<BrokerProvider>,
    deliveries: DeliveryStream,
}

impl Session {
    async fn open(connector: &BrokerConnector, topology: &Topology) -> Result<Self> {
        let transport = connector.connect().await?;

        let consuming = async {
            transport.declare_topology(topology).await?;
            transport.start_consuming(&topology.queue, CONSUMER_TAG).await
        };

        match consuming.await {
            Ok(deliveries) => Ok(Self {
                transport: Arc::new(transport),
                deliveries,
            }),
            Err(e) => {
                if let Err(close_error) = transport.close().await {
                    debug!(error = %close_error, "Close after failed setup also failed");
                }
                Err(e.into())
            }
        }
    }
}

/// RPC consumer for the user service
pub struct UserRpcConsumer {
    config: ConsumerConfig,
    connector: BrokerConnector,
    services: Arc<dyn ServiceProvider>,
}

impl std::fmt::Debug for UserRpcConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRpcConsumer")
            .field("provider", &self.connector.provider_name())
            .field("queue", &self.config.topology.queue)
            .finish()
    }
}

impl UserRpcConsumer {
    pub fn new(
        config: ConsumerConfig,
        connector: impl Into<BrokerConnector>,
        services: Arc<dyn ServiceProvider>,
    ) -> Self {
        Self {
            config,
            connector: connector.into(),
            services,
        }
    }

    /// Connect, declare the topology, start consuming and spawn the loop
    pub async fn start(self) -> Result<ConsumerHandle> {
        self.config
            .validate()
            .map_err(ConfigurationError::from)?;

        let topology = Topology::from_config(&self.config.topology);
        info!(
            provider = self.connector.provider_name(),
            exchange = %topology.exchange,
            queue = %topology.queue,
            bindings = topology.bindings.len(),
            dead_letter = topology.dead_letter.is_some(),
            "Starting user RPC consumer"
        );

        let session = Session::open(&self.connector, &topology).await?;
        let transport: TransportSlot = Arc::new(Mutex::new(Some(Arc::clone(&session.transport))));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let delivery_loop = DeliveryLoop {
            connector: self.connector,
            topology,
            processor: DeliveryProcessor::new(self.services, &self.config),
            reconnect: self.config.reconnect,
            transport: Arc::clone(&transport),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(delivery_loop.run(session));

        info!("User RPC consumer started");
        Ok(ConsumerHandle {
            shutdown: shutdown_tx,
            task: Some(task),
            transport,
            shutdown_timeout: self.config.delivery.shutdown_timeout(),
        })
    }
}

/// Handle to a running consumer
///
/// Dropping the handle signals shutdown without waiting for it.
#[derive(Debug)]
pub struct ConsumerHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<Result<()>>>,
    transport: TransportSlot,
    shutdown_timeout: Duration,
}

impl ConsumerHandle {
    /// Whether the transport currently in use is connected
    pub fn is_connected(&self) -> bool {
        self.transport
            .lock()
            .as_ref()
            .is_some_and(|transport| transport.is_connected())
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end on its own (reconnects exhausted)
    ///
    /// Cancel safe; a later [`stop`](Self::stop) still cleans up.
    pub async fn join(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let result = task.await;
        self.task = None;
        flatten_join(result)
    }

    /// Signal shutdown, wait for the in-flight delivery, close the transport
    pub async fn stop(mut self) -> Result<()> {
        info!("Stopping user RPC consumer");
        self.shutdown.send_replace(true);

        let result = match self.task.take() {
            Some(mut task) => match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(joined) => flatten_join(joined),
                Err(_) => {
                    warn!(
                        timeout_seconds = self.shutdown_timeout.as_secs(),
                        "In-flight delivery did not finish in time, aborting consumer task"
                    );
                    task.abort();
                    Ok(())
                }
            },
            None => Ok(()),
        };

        let transport = self.transport.lock().take();
        if let Some(transport) = transport {
            if let Err(e) = transport.close().await {
                warn!(error = %e, "Failed to close broker transport");
                return result.and(Err(e.into()));
            }
        }

        info!("User RPC consumer stopped");
        result
    }
}

fn flatten_join(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| ConsumerError::task_failed(e.to_string()))?
}

struct DeliveryLoop {
    connector: BrokerConnector,
    topology: Topology,
    processor: DeliveryProcessor,
    reconnect: crate::config::ReconnectConfig,
    transport: TransportSlot,
    shutdown: watch::Receiver<bool>,
}

impl DeliveryLoop {
    async fn run(mut self, mut session: Session) -> Result<()> {
        loop {
            let lost = tokio::select! {
                biased;

                _ = self.shutdown.changed() => {
                    debug!("Shutdown signal received by delivery loop");
                    return self.close_transport().await;
                }

                next = session.deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        match self.processor.process(&session.transport, delivery).await {
                            Ok(_) => continue,
                            Err(e) => e,
                        }
                    }
                    Some(Err(e)) => e,
                    None if *self.shutdown.borrow() => return self.close_transport().await,
                    None => MessagingError::consumer_closed(format!(
                        "{}: delivery stream ended",
                        self.topology.queue
                    )),
                },
            };

            error!(
                provider = session.transport.provider_name(),
                error = %lost,
                "Broker connection lost"
            );

            match self.reestablish(&session.transport, lost).await? {
                Some(next) => session = next,
                None => return Ok(()),
            }
        }
    }

    /// Close the transport still in the slot, channel then connection
    ///
    /// Covers a dropped handle; after [`ConsumerHandle::stop`] the slot may
    /// already be empty.
    async fn close_transport(&self) -> Result<()> {
        let transport = self.transport.lock().take();
        let Some(transport) = transport else {
            return Ok(());
        };
        transport.close().await.map_err(|e| {
            warn!(error = %e, "Failed to close broker transport");
            e.into()
        })
    }

    /// Reconnect with backoff; `None` when shutdown was requested meanwhile
    async fn reestablish(
        &mut self,
        lost: &BrokerProvider,
        cause: MessagingError,
    ) -> Result<Option<Session>> {
        if let Err(e) = lost.close().await {
            debug!(error = %e, "Closing the lost transport failed");
        }
        self.transport.lock().take();

        let mut backoff = ReconnectBackoff::new(&self.reconnect);
        let mut last_error = cause;

        loop {
            let Some(delay) = backoff.next_delay() else {
                error!(attempts = backoff.attempts(), "Reconnect attempts exhausted");
                return Err(ConsumerError::reconnect_exhausted(backoff.attempts(), last_error));
            };

            tokio::select! {
                biased;
                _ = self.shutdown.changed() => return Ok(None),
                _ = tokio::time::sleep(delay) => {}
            }

            info!(
                attempt = backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to broker"
            );

            match Session::open(&self.connector, &self.topology).await {
                Ok(session) => {
                    *self.transport.lock() = Some(Arc::clone(&session.transport));
                    info!(attempt = backoff.attempts(), "Reconnected to broker");
                    return Ok(Some(session));
                }
                Err(ConsumerError::Messaging(e)) => {
                    warn!(attempt = backoff.attempts(), error = %e, "Reconnect attempt failed");
                    last_error = e;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InMemoryUserStore;
    use crate::messaging::InMemoryBroker;

    #[tokio::test]
    async fn test_start_declares_topology_and_stop_closes() {
        let broker = InMemoryBroker::new();
        let consumer = UserRpcConsumer::new(
            ConsumerConfig::default(),
            broker.clone(),
            Arc::new(InMemoryUserStore::new()),
        );

        let handle = consumer.start().await.unwrap();
        assert!(handle.is_connected());
        assert!(broker.queue_exists("user-api-queue"));
        assert!(broker.queue_exists("user-api-queue.dlq"));
        assert_eq!(broker.open_connections(), 1);

        handle.stop().await.unwrap();
        assert_eq!(broker.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_start() {
        let mut config = ConsumerConfig::default();
        config.topology.queue = String::new();

        let result = UserRpcConsumer::new(config, InMemoryBroker::new(), Arc::new(InMemoryUserStore::new()))
            .start()
            .await;
        assert!(matches!(result, Err(ConsumerError::Configuration(_))));
    }
}
