//! # RabbitMQ Transport
//!
//! [`BrokerTransport`] over AMQP 0.9.1 using the `lapin` crate.
//!
//! - **Durable topology**: topic exchange and queue survive broker restarts
//! - **Dead Letter Exchange**: rejected deliveries route to `<queue>.dlq`
//! - **Prefetch**: per-consumer QoS limit (global = false)
//! - **Push delivery**: `basic_consume` stream, manual ack
//!
//! ## Usage
//!
//! ```ignore
//! use user_service_rpc::config::BrokerConfig;
//! use user_service_rpc::messaging::service::providers::RabbitMqTransport;
//!
//! let transport = RabbitMqTransport::connect(&BrokerConfig::default()).await?;
//! transport.declare_topology(&topology).await?;
//! let mut deliveries = transport.start_consuming("user-api-queue", "user-api-consumer").await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::constants::delivery::DELIVERY_COUNT_HEADER;
use crate::messaging::service::topology::{DeadLetterTopology, Topology};
use crate::messaging::service::traits::{BrokerTransport, DeliveryStream};
use crate::messaging::service::types::{DeliveryTag, InboundDelivery, OutboundMessage};
use crate::messaging::{MessagingError, MessagingResult};

const REPLY_SUCCESS: u16 = 200;

/// One lapin connection with one channel
pub struct RabbitMqTransport {
    connection: Connection,
    channel: Channel,
    url_redacted: String,
}

impl fmt::Debug for RabbitMqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMqTransport")
            .field("url", &self.url_redacted)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl RabbitMqTransport {
    /// Open a connection and a channel
    ///
    /// # Errors
    /// [`MessagingError::Timeout`] when the broker does not answer within
    /// `connection_timeout_seconds`, [`MessagingError::Connection`] otherwise.
    pub async fn connect(config: &BrokerConfig) -> MessagingResult<Self> {
        let url_redacted = config.url_redacted();
        debug!(url = %url_redacted, "Connecting to RabbitMQ");

        let connect = Connection::connect(
            &config.url,
            ConnectionProperties::default()
                .with_connection_name(config.connection_name.clone().into()),
        );

        let connection = tokio::time::timeout(config.connection_timeout(), connect)
            .await
            .map_err(|_| {
                MessagingError::timeout(
                    "rabbitmq_connect",
                    u64::from(config.connection_timeout_seconds),
                )
            })?
            .map_err(|e| MessagingError::connection(format!("RabbitMQ connection failed: {e}")))?;

        let channel = connection.create_channel().await.map_err(|e| {
            MessagingError::connection(format!("RabbitMQ channel creation failed: {e}"))
        })?;

        info!(url = %url_redacted, "Connected to RabbitMQ");

        Ok(Self {
            connection,
            channel,
            url_redacted,
        })
    }

    /// Declare the dead-letter exchange and queue for the main queue
    async fn setup_dlx(&self, dead_letter: &DeadLetterTopology) -> MessagingResult<()> {
        self.channel
            .exchange_declare(
                &dead_letter.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::topology(&dead_letter.exchange, format!("DLX declaration failed: {e}"))
            })?;

        self.channel
            .queue_declare(
                &dead_letter.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::topology(&dead_letter.queue, format!("DLQ declaration failed: {e}"))
            })?;

        self.channel
            .queue_bind(
                &dead_letter.queue,
                &dead_letter.exchange,
                &dead_letter.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::topology(&dead_letter.queue, format!("DLQ binding failed: {e}"))
            })?;

        Ok(())
    }
}

fn queue_arguments(topology: &Topology) -> FieldTable {
    let mut args = FieldTable::default();
    if let Some(dead_letter) = &topology.dead_letter {
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(dead_letter.exchange.clone().into()),
        );
        args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(dead_letter.routing_key.clone().into()),
        );
    }
    args
}

fn header_as_u32(value: &AMQPValue) -> Option<u32> {
    match value {
        AMQPValue::ShortShortUInt(n) => Some(u32::from(*n)),
        AMQPValue::ShortUInt(n) => Some(u32::from(*n)),
        AMQPValue::LongUInt(n) => Some(*n),
        AMQPValue::ShortShortInt(n) => u32::try_from(*n).ok(),
        AMQPValue::ShortInt(n) => u32::try_from(*n).ok(),
        AMQPValue::LongInt(n) => u32::try_from(*n).ok(),
        AMQPValue::LongLongInt(n) => u32::try_from(*n).ok(),
        _ => None,
    }
}

fn delivery_count(properties: &BasicProperties) -> Option<u32> {
    properties.headers().as_ref().and_then(|headers| {
        headers
            .inner()
            .iter()
            .find(|(key, _)| key.as_str() == DELIVERY_COUNT_HEADER)
            .and_then(|(_, value)| header_as_u32(value))
    })
}

fn to_inbound(delivery: Delivery) -> InboundDelivery {
    let properties = &delivery.properties;
    InboundDelivery {
        delivery_tag: DeliveryTag(delivery.delivery_tag),
        routing_key: delivery.routing_key.as_str().to_string(),
        correlation_id: properties
            .correlation_id()
            .as_ref()
            .map(|c| c.as_str().to_string()),
        reply_to: properties.reply_to().as_ref().map(|r| r.as_str().to_string()),
        redelivered: delivery.redelivered,
        delivery_count: delivery_count(properties),
        body: delivery.data,
    }
}

#[async_trait]
impl BrokerTransport for RabbitMqTransport {
    async fn declare_topology(&self, topology: &Topology) -> MessagingResult<()> {
        self.channel
            .exchange_declare(
                &topology.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::topology(&topology.exchange, format!("Exchange declaration failed: {e}"))
            })?;

        if let Some(dead_letter) = &topology.dead_letter {
            self.setup_dlx(dead_letter).await?;
        }

        self.channel
            .queue_declare(
                &topology.queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                queue_arguments(topology),
            )
            .await
            .map_err(|e| {
                MessagingError::topology(&topology.queue, format!("Queue declaration failed: {e}"))
            })?;

        for routing_key in &topology.bindings {
            self.channel
                .queue_bind(
                    &topology.queue,
                    &topology.exchange,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    MessagingError::topology(
                        &topology.queue,
                        format!("Binding {routing_key} failed: {e}"),
                    )
                })?;
            debug!(queue = %topology.queue, routing_key = %routing_key, "Binding declared");
        }

        self.channel
            .basic_qos(topology.prefetch_count, BasicQosOptions { global: false })
            .await
            .map_err(|e| MessagingError::configuration("rabbitmq", format!("Failed to set QoS: {e}")))?;

        info!(
            exchange = %topology.exchange,
            queue = %topology.queue,
            bindings = topology.bindings.len(),
            prefetch = topology.prefetch_count,
            dead_letter = topology.dead_letter.is_some(),
            "RabbitMQ topology declared"
        );

        Ok(())
    }

    async fn start_consuming(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> MessagingResult<DeliveryStream> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::consume(queue, format!("basic_consume failed: {e}")))?;

        let queue_name = queue.to_string();
        let stream = consumer.map(move |result| {
            result
                .map(to_inbound)
                .map_err(|e| MessagingError::consumer_closed(format!("{queue_name}: {e}")))
        });

        Ok(Box::pin(stream))
    }

    async fn ack(&self, delivery_tag: DeliveryTag) -> MessagingResult<()> {
        self.channel
            .basic_ack(delivery_tag.value(), BasicAckOptions { multiple: false })
            .await
            .map_err(|e| MessagingError::ack("channel", delivery_tag.value(), format!("ack failed: {e}")))
    }

    async fn nack(&self, delivery_tag: DeliveryTag, requeue: bool) -> MessagingResult<()> {
        self.channel
            .basic_nack(
                delivery_tag.value(),
                BasicNackOptions {
                    multiple: false,
                    requeue,
                },
            )
            .await
            .map_err(|e| {
                MessagingError::nack("channel", delivery_tag.value(), format!("nack failed: {e}"))
            })
    }

    async fn publish(&self, exchange: &str, message: OutboundMessage) -> MessagingResult<()> {
        let mut properties = BasicProperties::default();
        if let Some(correlation_id) = message.correlation_id {
            properties = properties.with_correlation_id(correlation_id.into());
        }
        if let Some(reply_to) = message.reply_to {
            properties = properties.with_reply_to(reply_to.into());
        }
        if let Some(content_type) = message.content_type {
            properties = properties.with_content_type(content_type.into());
        }
        if let Some(timestamp) = message.timestamp {
            properties = properties.with_timestamp(u64::try_from(timestamp.timestamp()).unwrap_or(0));
        }

        let confirm = self
            .channel
            .basic_publish(
                exchange,
                &message.routing_key,
                BasicPublishOptions::default(),
                &message.body,
                properties,
            )
            .await
            .map_err(|e| MessagingError::publish(&message.routing_key, e.to_string()))?;

        confirm
            .await
            .map_err(|e| MessagingError::publish(&message.routing_key, format!("confirmation failed: {e}")))?;

        Ok(())
    }

    async fn close(&self) -> MessagingResult<()> {
        let channel_result = if self.channel.status().connected() {
            self.channel
                .close(REPLY_SUCCESS, "consumer shutdown")
                .await
                .map_err(|e| MessagingError::connection(format!("channel close failed: {e}")))
        } else {
            Ok(())
        };

        let connection_result = if self.connection.status().connected() {
            self.connection
                .close(REPLY_SUCCESS, "consumer shutdown")
                .await
                .map_err(|e| MessagingError::connection(format!("connection close failed: {e}")))
        } else {
            Ok(())
        };

        if let Err(e) = &channel_result {
            warn!(error = %e, "Failed to close RabbitMQ channel");
        }
        if let Err(e) = &connection_result {
            warn!(error = %e, "Failed to close RabbitMQ connection");
        }

        channel_result.and(connection_result)
    }

    fn is_connected(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    fn provider_name(&self) -> &'static str {
        "rabbitmq"
    }
}
