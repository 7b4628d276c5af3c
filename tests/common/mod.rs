//! Shared helpers for the consumer integration tests.

#![allow(dead_code)]

pub mod doubles;
pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use user_service_rpc::config::ConsumerConfig;
use user_service_rpc::consumer::{ConsumerHandle, UserRpcConsumer};
use user_service_rpc::domain::ServiceProvider;
use user_service_rpc::messaging::{InMemoryBroker, OutboundMessage};

pub const EXCHANGE: &str = "user-exchange";
pub const QUEUE: &str = "user-api-queue";
pub const DEAD_LETTER_QUEUE: &str = "user-api-queue.dlq";
pub const REPLY_QUEUE: &str = "amq.gen-test-replies";

/// Defaults with short timers so failure paths finish quickly
pub fn test_config() -> ConsumerConfig {
    let mut config = ConsumerConfig::default();
    config.delivery.handler_timeout_seconds = 1;
    config.delivery.shutdown_timeout_seconds = 5;
    config.reconnect.initial_delay_ms = 10;
    config.reconnect.max_delay_ms = 50;
    config
}

/// Broker with the reply queue a client would have declared
pub fn broker() -> InMemoryBroker {
    let broker = InMemoryBroker::new();
    broker.declare_queue(REPLY_QUEUE);
    broker
}

pub async fn start(
    broker: &InMemoryBroker,
    config: ConsumerConfig,
    services: Arc<dyn ServiceProvider>,
) -> ConsumerHandle {
    UserRpcConsumer::new(config, broker.clone(), services)
        .start()
        .await
        .expect("consumer should start against the in-memory broker")
}

/// Builder for request messages as a client publishes them
pub struct RequestBuilder {
    routing_key: String,
    body: Vec<u8>,
    correlation_id: Option<String>,
    reply_to: Option<String>,
}

impl RequestBuilder {
    pub fn new(routing_key: &str) -> Self {
        Self {
            routing_key: routing_key.to_string(),
            body: b"{}".to_vec(),
            correlation_id: None,
            reply_to: Some(REPLY_QUEUE.to_string()),
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = body.to_string().into_bytes();
        self
    }

    pub fn raw(mut self, body: &[u8]) -> Self {
        self.body = body.to_vec();
        self
    }

    pub fn correlation_id(mut self, correlation_id: &str) -> Self {
        self.correlation_id = Some(correlation_id.to_string());
        self
    }

    pub fn no_reply(mut self) -> Self {
        self.reply_to = None;
        self
    }

    pub fn build(self) -> OutboundMessage {
        let mut message = OutboundMessage::json(self.routing_key, self.body);
        if let Some(correlation_id) = self.correlation_id {
            message = message.with_correlation_id(correlation_id);
        }
        if let Some(reply_to) = self.reply_to {
            message = message.with_reply_to(reply_to);
        }
        message
    }

    pub fn publish(self, broker: &InMemoryBroker) {
        broker.publish(EXCHANGE, self.build());
    }
}

/// Poll until `condition` holds; panics after five seconds
pub async fn eventually(description: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {description}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait for `count` replies and return their JSON bodies
pub async fn replies(broker: &InMemoryBroker, count: usize) -> Vec<OutboundMessage> {
    eventually(&format!("{count} replies"), || {
        broker.published_to(REPLY_QUEUE).len() >= count
    })
    .await;
    broker.published_to(REPLY_QUEUE)
}

pub fn body(message: &OutboundMessage) -> Value {
    message.json_body().expect("reply body should be JSON")
}

pub fn paciente(nro_documento: &str, email: &str) -> Value {
    json!({
        "Nombre": "Ana",
        "Apellido": "Pérez",
        "IdTipoDocumento": 1,
        "NroDocumento": nro_documento,
        "Email": email,
        "Password": "secret",
        "IdRol": 3,
        "FechaNacimiento": "1950-04-12",
        "DiagnosticoInicial": "Alzheimer leve"
    })
}

pub fn medico(nro_documento: &str, email: &str) -> Value {
    json!({
        "Nombre": "Luis",
        "Apellido": "Gómez",
        "IdTipoDocumento": 1,
        "NroDocumento": nro_documento,
        "Email": email,
        "Password": "secret",
        "IdRol": 7,
        "FechaNacimiento": "1975-09-30",
        "Especialidad": "Neurología"
    })
}
