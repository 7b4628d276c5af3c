#![allow(clippy::doc_markdown)] // Allow technical terms like RabbitMQ, AMQP in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # User Service RPC
//!
//! RabbitMQ request/reply consumer for the user service.
//!
//! ## Overview
//!
//! Clients publish requests to the `user-exchange` topic exchange with a
//! routing key such as `user.api.paciente.create`, a correlation id and a
//! reply queue. The consumer routes each request to its handler, calls the
//! domain service and publishes a correlated JSON envelope back to the reply
//! queue through the default exchange.
//!
//! ## Delivery Semantics
//!
//! - One delivery in flight at a time (prefetch 1), processed in broker order
//! - Domain outcomes, including failures, are replied to and acked
//! - Decode defects and handler timeouts are replied to and nacked with
//!   requeue; after `max_delivery_attempts` they are dead-lettered instead
//! - Unroutable keys get a terminal error envelope and are acked
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (defaults, TOML, environment)
//! - [`messaging`] - Routing keys, envelopes, broker transports
//! - [`dispatch`] - Routing-key → handler table
//! - [`handlers`] - Per-entity request handlers
//! - [`domain`] - Domain service interface and in-memory reference store
//! - [`consumer`] - Delivery loop, redelivery policy, lifecycle
//! - [`logging`] - Tracing setup and delivery log macro
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use user_service_rpc::config::ConfigLoader;
//! use user_service_rpc::consumer::UserRpcConsumer;
//! use user_service_rpc::domain::InMemoryUserStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load_from_env()?;
//! let consumer = UserRpcConsumer::new(
//!     config.clone(),
//!     config.broker.clone(),
//!     Arc::new(InMemoryUserStore::new()),
//! );
//!
//! let handle = consumer.start().await?;
//! tokio::signal::ctrl_c().await?;
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod consumer;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod messaging;

pub use config::{ConfigLoader, ConsumerConfig};
pub use consumer::{ConsumerHandle, DeliveryOutcome, UserRpcConsumer};
pub use dispatch::DispatchTable;
pub use domain::{InMemoryUserStore, ServiceProvider, ServiceScope};
pub use error::{ConsumerError, Result};
pub use messaging::{
    BrokerConnector, InMemoryBroker, RequestEnvelope, ResponseEnvelope, Route,
};
