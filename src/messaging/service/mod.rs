//! # Broker Service Abstraction
//!
//! Provider-agnostic broker access with enum dispatch.
//!
//! ```text
//! BrokerConnector (enum)        <- creates connections (start + reconnect)
//!   ├── RabbitMq(BrokerConfig)
//!   └── InMemory(InMemoryBroker)
//!
//! BrokerProvider (enum)         <- one connected transport
//!   ├── RabbitMq(RabbitMqTransport)
//!   └── InMemory(InMemoryTransport)
//! ```

mod provider;
pub mod providers;
mod topology;
mod traits;
mod types;

pub use provider::{BrokerConnector, BrokerProvider};
pub use providers::{InMemoryBroker, InMemoryTransport, PublishedMessage, RabbitMqTransport};
pub use topology::{DeadLetterTopology, Topology};
pub use traits::{BrokerTransport, DeliveryStream};
pub use types::{DeliveryTag, InboundDelivery, OutboundMessage};

pub use super::errors::MessagingError;
pub use super::MessagingResult;
