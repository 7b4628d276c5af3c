//! # Broker Provider Enum
//!
//! Enum dispatch over the broker transports, and the connector that produces
//! a fresh transport on start and after every connection loss.

use super::providers::{InMemoryBroker, InMemoryTransport, RabbitMqTransport};
use super::topology::Topology;
use super::traits::{BrokerTransport, DeliveryStream};
use super::types::{DeliveryTag, OutboundMessage};
use crate::config::BrokerConfig;
use crate::messaging::MessagingResult;

/// Connected transport
///
/// Enum dispatch instead of `Box<dyn BrokerTransport>`: the set of providers
/// is closed and every delivery goes through these calls.
#[derive(Debug)]
pub enum BrokerProvider {
    /// RabbitMQ over AMQP 0.9.1 (lapin)
    RabbitMq(RabbitMqTransport),

    /// In-process broker for tests and local runs
    InMemory(InMemoryTransport),
}

impl BrokerProvider {
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::RabbitMq(t) => t.provider_name(),
            Self::InMemory(t) => t.provider_name(),
        }
    }

    pub async fn declare_topology(&self, topology: &Topology) -> MessagingResult<()> {
        match self {
            Self::RabbitMq(t) => t.declare_topology(topology).await,
            Self::InMemory(t) => t.declare_topology(topology).await,
        }
    }

    pub async fn start_consuming(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> MessagingResult<DeliveryStream> {
        match self {
            Self::RabbitMq(t) => t.start_consuming(queue, consumer_tag).await,
            Self::InMemory(t) => t.start_consuming(queue, consumer_tag).await,
        }
    }

    pub async fn ack(&self, delivery_tag: DeliveryTag) -> MessagingResult<()> {
        match self {
            Self::RabbitMq(t) => t.ack(delivery_tag).await,
            Self::InMemory(t) => t.ack(delivery_tag).await,
        }
    }

    pub async fn nack(&self, delivery_tag: DeliveryTag, requeue: bool) -> MessagingResult<()> {
        match self {
            Self::RabbitMq(t) => t.nack(delivery_tag, requeue).await,
            Self::InMemory(t) => t.nack(delivery_tag, requeue).await,
        }
    }

    pub async fn publish(&self, exchange: &str, message: OutboundMessage) -> MessagingResult<()> {
        match self {
            Self::RabbitMq(t) => t.publish(exchange, message).await,
            Self::InMemory(t) => t.publish(exchange, message).await,
        }
    }

    pub async fn close(&self) -> MessagingResult<()> {
        match self {
            Self::RabbitMq(t) => t.close().await,
            Self::InMemory(t) => t.close().await,
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            Self::RabbitMq(t) => t.is_connected(),
            Self::InMemory(t) => t.is_connected(),
        }
    }
}

/// Produces connected [`BrokerProvider`]s
#[derive(Debug, Clone)]
pub enum BrokerConnector {
    RabbitMq(BrokerConfig),
    InMemory(InMemoryBroker),
}

impl BrokerConnector {
    pub async fn connect(&self) -> MessagingResult<BrokerProvider> {
        match self {
            Self::RabbitMq(config) => Ok(BrokerProvider::RabbitMq(
                RabbitMqTransport::connect(config).await?,
            )),
            Self::InMemory(broker) => Ok(BrokerProvider::InMemory(broker.connect())),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::RabbitMq(_) => "rabbitmq",
            Self::InMemory(_) => "in_memory",
        }
    }
}

impl From<BrokerConfig> for BrokerConnector {
    fn from(config: BrokerConfig) -> Self {
        Self::RabbitMq(config)
    }
}

impl From<InMemoryBroker> for BrokerConnector {
    fn from(broker: InMemoryBroker) -> Self {
        Self::InMemory(broker)
    }
}
