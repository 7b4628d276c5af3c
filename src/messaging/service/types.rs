//! # Messaging Service Types
//!
//! Provider-agnostic delivery and message types.

use std::fmt;

use chrono::{DateTime, Utc};

/// Broker-assigned handle used to ack/nack a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryTag(pub u64);

impl DeliveryTag {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DeliveryTag {
    fn from(tag: u64) -> Self {
        Self(tag)
    }
}

/// A message delivered to the consumer, not yet acknowledged
#[derive(Debug, Clone, PartialEq)]
pub struct InboundDelivery {
    pub delivery_tag: DeliveryTag,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    /// Broker flag: this message was delivered before
    pub redelivered: bool,
    /// Previous delivery attempts reported by the broker (`x-delivery-count`)
    pub delivery_count: Option<u32>,
}

impl InboundDelivery {
    pub fn new(delivery_tag: impl Into<DeliveryTag>, routing_key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            delivery_tag: delivery_tag.into(),
            routing_key: routing_key.into(),
            body,
            correlation_id: None,
            reply_to: None,
            redelivered: false,
            delivery_count: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_redelivered(mut self, redelivered: bool) -> Self {
        self.redelivered = redelivered;
        self
    }

    pub fn with_delivery_count(mut self, delivery_count: u32) -> Self {
        self.delivery_count = Some(delivery_count);
        self
    }

    /// Reply destination, treating an empty string as absent
    pub fn reply_destination(&self) -> Option<&str> {
        self.reply_to.as_deref().filter(|r| !r.is_empty())
    }
}

/// A message to publish
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub routing_key: String,
    pub body: Vec<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub content_type: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl OutboundMessage {
    pub fn new(routing_key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            routing_key: routing_key.into(),
            body,
            correlation_id: None,
            reply_to: None,
            content_type: None,
            timestamp: None,
        }
    }

    /// Message carrying a JSON body
    pub fn json(routing_key: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(routing_key, body).with_content_type("application/json")
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Body parsed as JSON (test and diagnostics helper)
    pub fn json_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
