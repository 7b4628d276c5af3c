//! # Broker Transport Implementations
//!
//! - `RabbitMqTransport`: AMQP 0.9.1 via lapin
//! - `InMemoryTransport`: in-process broker for tests

mod in_memory;
mod rabbitmq;

pub use in_memory::{topic_matches, InMemoryBroker, InMemoryTransport, PublishedMessage};
pub use rabbitmq::RabbitMqTransport;
