//! # Delivery Processor
//!
//! Settles one delivery: resolve correlation metadata, dispatch under the
//! handler timeout, reply when a destination was given, then ack or nack.
//!
//! ```text
//! handler Ok(envelope)  -> reply(envelope)            -> ack
//! handler Err(defect)   -> reply({success:false,...}) -> nack(requeue) | nack(dead-letter)
//! ```
//!
//! Replies are best effort: a failed publish is logged and the ack/nack
//! decision stands. Ack/nack failures are returned so the caller can
//! reconnect.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::redelivery::{FailureDisposition, RedeliveryPolicy};
use super::reply::publish_reply;
use crate::config::ConsumerConfig;
use crate::dispatch::DispatchTable;
use crate::domain::ServiceProvider;
use crate::handlers::{HandlerError, HandlerResult};
use crate::log_delivery;
use crate::messaging::{BrokerProvider, InboundDelivery, MessagingResult, ResponseEnvelope};

/// How a delivery was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acked,
    Requeued,
    DeadLettered,
}

pub struct DeliveryProcessor {
    dispatch: DispatchTable,
    services: Arc<dyn ServiceProvider>,
    handler_timeout: Option<Duration>,
    redelivery: RedeliveryPolicy,
}

impl std::fmt::Debug for DeliveryProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryProcessor")
            .field("routes", &self.dispatch.len())
            .field("handler_timeout", &self.handler_timeout)
            .field("max_attempts", &self.redelivery.max_attempts())
            .finish()
    }
}

impl DeliveryProcessor {
    pub fn new(services: Arc<dyn ServiceProvider>, config: &ConsumerConfig) -> Self {
        Self {
            dispatch: DispatchTable::new(),
            services,
            handler_timeout: config.delivery.handler_timeout(),
            redelivery: RedeliveryPolicy::new(config.attempt_limit()),
        }
    }

    /// Process and settle one delivery
    pub async fn process(
        &self,
        transport: &BrokerProvider,
        delivery: InboundDelivery,
    ) -> MessagingResult<DeliveryOutcome> {
        let correlation_id = delivery
            .correlation_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let span = info_span!(
            "delivery",
            correlation_id = %correlation_id,
            routing_key = %delivery.routing_key,
            delivery_tag = %delivery.delivery_tag,
        );

        self.settle(transport, &delivery, &correlation_id)
            .instrument(span)
            .await
    }

    async fn settle(
        &self,
        transport: &BrokerProvider,
        delivery: &InboundDelivery,
        correlation_id: &str,
    ) -> MessagingResult<DeliveryOutcome> {
        log_delivery!(
            info,
            "Message received",
            correlation_id: correlation_id,
            routing_key: delivery.routing_key,
            redelivered: delivery.redelivered,
        );

        match self.run_handler(delivery).await {
            Ok(envelope) => {
                self.reply(transport, delivery, correlation_id, &envelope).await;
                transport.ack(delivery.delivery_tag).await?;
                self.redelivery.on_settled(delivery);
                log_delivery!(
                    info,
                    "Message acknowledged",
                    correlation_id: correlation_id,
                    success: envelope.is_success(),
                );
                Ok(DeliveryOutcome::Acked)
            }
            Err(error) => {
                log_delivery!(
                    error,
                    "Message processing failed",
                    correlation_id: correlation_id,
                    error_kind: error.kind(),
                    error: error,
                );

                let envelope = ResponseEnvelope::error(error.to_string());
                self.reply(transport, delivery, correlation_id, &envelope).await;

                match self.redelivery.on_failure(delivery) {
                    FailureDisposition::Requeue { attempt } => {
                        transport.nack(delivery.delivery_tag, true).await?;
                        log_delivery!(
                            warn,
                            "Message requeued",
                            correlation_id: correlation_id,
                            attempt: attempt,
                        );
                        Ok(DeliveryOutcome::Requeued)
                    }
                    FailureDisposition::DeadLetter { attempt } => {
                        transport.nack(delivery.delivery_tag, false).await?;
                        log_delivery!(
                            error,
                            "Message dead-lettered after repeated failures",
                            correlation_id: correlation_id,
                            attempt: attempt,
                        );
                        Ok(DeliveryOutcome::DeadLettered)
                    }
                }
            }
        }
    }

    async fn run_handler(&self, delivery: &InboundDelivery) -> HandlerResult {
        let scope = self.services.create_scope();
        let dispatched = self
            .dispatch
            .dispatch(&scope, &delivery.routing_key, &delivery.body);

        match self.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, dispatched)
                .await
                .unwrap_or_else(|_| Err(HandlerError::timeout(limit.as_secs()))),
            None => dispatched.await,
        }
    }

    async fn reply(
        &self,
        transport: &BrokerProvider,
        delivery: &InboundDelivery,
        correlation_id: &str,
        envelope: &ResponseEnvelope,
    ) {
        let Some(reply_to) = delivery.reply_destination() else {
            log_delivery!(debug, "No reply destination, reply skipped", correlation_id: correlation_id);
            return;
        };

        if let Err(e) = publish_reply(transport, reply_to, correlation_id, envelope).await {
            log_delivery!(
                error,
                "Failed to publish reply",
                correlation_id: correlation_id,
                reply_to: reply_to,
                error: e,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliveryConfig;
    use crate::domain::InMemoryUserStore;
    use crate::messaging::{InMemoryBroker, OutboundMessage, Topology};
    use futures::StreamExt;
    use serde_json::json;

    async fn setup(delivery: DeliveryConfig) -> (InMemoryBroker, BrokerProvider, DeliveryProcessor) {
        setup_with(ConsumerConfig {
            delivery,
            ..Default::default()
        })
        .await
    }

    async fn setup_with(config: ConsumerConfig) -> (InMemoryBroker, BrokerProvider, DeliveryProcessor) {
        let broker = InMemoryBroker::new();
        broker.declare_queue("reply-q");
        let transport = BrokerProvider::InMemory(broker.connect());
        transport
            .declare_topology(&Topology::from_config(&config.topology))
            .await
            .unwrap();
        let processor = DeliveryProcessor::new(Arc::new(InMemoryUserStore::new()), &config);
        (broker, transport, processor)
    }

    #[tokio::test]
    async fn test_success_replies_then_acks() {
        let (broker, transport, processor) = setup(DeliveryConfig::default()).await;
        broker.publish(
            "user-exchange",
            OutboundMessage::json("user.api.medico.getAll", b"{}".to_vec())
                .with_correlation_id("corr-1")
                .with_reply_to("reply-q"),
        );

        let mut deliveries = transport
            .start_consuming("user-api-queue", "test")
            .await
            .unwrap();
        let delivery = deliveries.next().await.unwrap().unwrap();
        let tag = delivery.delivery_tag;

        let outcome = processor.process(&transport, delivery).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Acked);
        assert_eq!(broker.acked(), vec![tag]);

        let replies = broker.published_to("reply-q");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].correlation_id.as_deref(), Some("corr-1"));
        assert_eq!(replies[0].json_body().unwrap()["count"], json!(0));
    }

    #[tokio::test]
    async fn test_decode_failure_replies_then_requeues() {
        let (broker, transport, processor) = setup(DeliveryConfig::default()).await;
        broker.publish(
            "user-exchange",
            OutboundMessage::json("user.api.paciente.create", b"{oops".to_vec())
                .with_correlation_id("corr-2")
                .with_reply_to("reply-q"),
        );

        let mut deliveries = transport
            .start_consuming("user-api-queue", "test")
            .await
            .unwrap();
        let delivery = deliveries.next().await.unwrap().unwrap();
        let tag = delivery.delivery_tag;

        let outcome = processor.process(&transport, delivery).await.unwrap();
        assert_eq!(outcome, DeliveryOutcome::Requeued);
        assert_eq!(broker.nacked(), vec![(tag, true)]);

        let reply = broker.published_to("reply-q")[0].json_body().unwrap();
        assert_eq!(reply["success"], json!(false));
        assert!(reply["error"].as_str().unwrap().starts_with("Malformed JSON"));

        let redelivered = deliveries.next().await.unwrap().unwrap();
        assert_eq!(redelivered.delivery_tag, tag);
        assert!(redelivered.redelivered);
    }

    #[tokio::test]
    async fn test_no_dead_letter_exchange_keeps_requeueing() {
        let mut config = ConsumerConfig::default();
        config.topology.dead_letter_enabled = false;
        config.delivery.max_delivery_attempts = 1;
        let (broker, transport, processor) = setup_with(config).await;
        broker.publish(
            "user-exchange",
            OutboundMessage::json("user.api.medico.delete", br#"{"Id":"bad"}"#.to_vec()),
        );

        let mut deliveries = transport
            .start_consuming("user-api-queue", "test")
            .await
            .unwrap();
        for _ in 0..3 {
            let delivery = deliveries.next().await.unwrap().unwrap();
            let outcome = processor.process(&transport, delivery).await.unwrap();
            assert_eq!(outcome, DeliveryOutcome::Requeued);
        }
        assert!(broker.nacked().iter().all(|(_, requeue)| *requeue));
    }

    #[tokio::test]
    async fn test_settle_errors_propagate() {
        let (broker, transport, processor) = setup(DeliveryConfig::default()).await;
        broker.publish(
            "user-exchange",
            OutboundMessage::json("user.api.medico.getAll", b"{}".to_vec()),
        );
        let mut deliveries = transport
            .start_consuming("user-api-queue", "test")
            .await
            .unwrap();
        let delivery = deliveries.next().await.unwrap().unwrap();

        transport.close().await.unwrap();
        assert!(processor.process(&transport, delivery).await.is_err());
    }
}
