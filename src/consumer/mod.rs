//! # Consumer
//!
//! The delivery loop and everything that settles a delivery.
//!
//! - [`lifecycle`]: start/stop, reconnect after connection loss
//! - [`processor`]: one delivery from receipt to ack/nack
//! - [`redelivery`]: attempt counting and dead-letter decision
//! - [`reply`]: correlated replies on the default exchange
//! - [`backoff`]: reconnect delays

pub mod backoff;
pub mod lifecycle;
pub mod processor;
pub mod redelivery;
pub mod reply;

pub use backoff::ReconnectBackoff;
pub use lifecycle::{ConsumerHandle, UserRpcConsumer};
pub use processor::{DeliveryOutcome, DeliveryProcessor};
pub use redelivery::{FailureDisposition, RedeliveryPolicy, RedeliveryTracker};
pub use reply::publish_reply;
