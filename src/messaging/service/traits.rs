//! # Broker Transport Trait
//!
//! Core operations the consumer needs from a broker connection.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::topology::Topology;
use super::types::{DeliveryTag, InboundDelivery, OutboundMessage};
use crate::messaging::MessagingResult;

/// Push-based delivery stream returned by [`BrokerTransport::start_consuming`]
///
/// An `Err` item means the consumer lost its channel; the stream ends after it.
/// The stream ending without an error means the transport was closed.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = MessagingResult<InboundDelivery>> + Send>>;

/// One broker connection with one channel
///
/// Implementations: RabbitMQ (lapin) and an in-memory broker for tests.
#[async_trait]
pub trait BrokerTransport: Send + Sync + 'static {
    /// Declare exchanges, queues and bindings; set the channel prefetch
    ///
    /// Safe to call repeatedly with the same topology.
    async fn declare_topology(&self, topology: &Topology) -> MessagingResult<()>;

    /// Start a manual-ack consumer on `queue`
    async fn start_consuming(&self, queue: &str, consumer_tag: &str)
        -> MessagingResult<DeliveryStream>;

    /// Acknowledge a single delivery
    async fn ack(&self, delivery_tag: DeliveryTag) -> MessagingResult<()>;

    /// Reject a single delivery
    ///
    /// `requeue = false` routes it to the queue's dead-letter exchange when
    /// one is configured, otherwise the broker drops it.
    async fn nack(&self, delivery_tag: DeliveryTag, requeue: bool) -> MessagingResult<()>;

    /// Publish to `exchange` (`""` is the default exchange)
    async fn publish(&self, exchange: &str, message: OutboundMessage) -> MessagingResult<()>;

    /// Close the channel, then the connection
    ///
    /// Both are attempted; the first failure is returned.
    async fn close(&self) -> MessagingResult<()>;

    fn is_connected(&self) -> bool;

    /// Provider name for logging ("rabbitmq", "in_memory")
    fn provider_name(&self) -> &'static str;
}
