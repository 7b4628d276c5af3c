//! # Messaging Error Types
//!
//! Structured errors for broker operations. Helper constructors keep call
//! sites short and make the operation that failed part of the message.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Topology declaration failed: {resource}: {message}")]
    Topology { resource: String, message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Publish failed: routing key {routing_key}: {message}")]
    Publish {
        routing_key: String,
        message: String,
    },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Timeout: operation {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Consumer closed: {message}")]
    ConsumerClosed { message: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },
}

impl MessagingError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Exchange/queue/binding declaration failure
    pub fn topology(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a consume error
    pub fn consume(queue_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::queue_operation(queue_name, "consume", message)
    }

    /// Create an ack error
    pub fn ack(queue_name: impl Into<String>, delivery_tag: u64, message: impl Into<String>) -> Self {
        Self::queue_operation(queue_name, format!("ack(delivery_tag={delivery_tag})"), message)
    }

    /// Create a nack error
    pub fn nack(
        queue_name: impl Into<String>,
        delivery_tag: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::queue_operation(queue_name, format!("nack(delivery_tag={delivery_tag})"), message)
    }

    pub fn publish(routing_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            routing_key: routing_key.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    pub fn consumer_closed(message: impl Into<String>) -> Self {
        Self::ConsumerClosed {
            message: message.into(),
        }
    }

    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_and_nack_name_the_delivery_tag() {
        let err = MessagingError::ack("user-api-queue", 42, "channel closed");
        assert_eq!(
            err.to_string(),
            "Queue operation failed: user-api-queue: ack(delivery_tag=42): channel closed"
        );

        let err = MessagingError::nack("user-api-queue", 7, "channel closed");
        assert!(err.to_string().contains("nack(delivery_tag=7)"));
    }

    #[test]
    fn test_connect_timeout_names_the_operation() {
        let err = MessagingError::timeout("rabbitmq_connect", 30);
        assert_eq!(
            err.to_string(),
            "Timeout: operation rabbitmq_connect timed out after 30s"
        );
    }
}
