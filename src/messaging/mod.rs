//! # Messaging Module
//!
//! Broker-facing side of the consumer: routing-key parsing, request/response
//! envelopes and the transport abstraction over RabbitMQ and the in-memory
//! broker.

pub mod envelope;
pub mod errors;
pub mod routing;
pub mod service;

pub use envelope::{DecodeError, RequestEnvelope, ResponseEnvelope};
pub use errors::MessagingError;
pub use routing::{binding_keys, parse_route, Action, Entity, Route, RoutingError};
pub use service::{
    BrokerConnector, BrokerProvider, BrokerTransport, DeliveryTag, InMemoryBroker,
    InboundDelivery, OutboundMessage, Topology,
};

pub type MessagingResult<T> = Result<T, MessagingError>;
