//! # In-Memory Broker
//!
//! Process-local broker implementing the parts of AMQP the consumer relies on.
//! Used by the test suite and for running the consumer without RabbitMQ.
//!
//! ## Features
//!
//! - **Topic and direct exchanges**: `*` matches one word, `#` zero or more
//! - **Default exchange**: routing key = queue name
//! - **Prefetch**: a consumer holds at most `prefetch_count` unacked deliveries
//! - **Requeue**: a nack with requeue puts the delivery back at the head of
//!   the queue with the *same* delivery tag and `redelivered = true`
//! - **Dead-lettering**: nack without requeue forwards to the queue's DLX;
//!   redeclaring a queue with different dead-letter arguments fails the way
//!   RabbitMQ does (`PRECONDITION_FAILED`)
//! - **Connection loss**: [`InMemoryBroker::drop_connections`] fails every
//!   open consumer and returns unacked deliveries to their queues;
//!   [`InMemoryBroker::refuse_connections`] makes reconnects fail
//! - **Recording**: acks, nacks and every publish are kept for assertions

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::constants::topology::DEFAULT_EXCHANGE;
use crate::messaging::service::topology::Topology;
use crate::messaging::service::traits::{BrokerTransport, DeliveryStream};
use crate::messaging::service::types::{DeliveryTag, InboundDelivery, OutboundMessage};
use crate::messaging::{MessagingError, MessagingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeKind {
    Topic,
    Direct,
}

#[derive(Debug, Clone)]
struct Binding {
    exchange: String,
    pattern: String,
    queue: String,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    delivery_tag: u64,
    message: OutboundMessage,
    redelivered: bool,
    /// Completed deliveries so far
    deliveries: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<StoredMessage>,
    dead_letter: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Open,
    Closed,
    Dropped,
}

#[derive(Debug)]
struct Connection {
    state: ConnectionState,
    prefetch: u16,
    /// delivery tag -> (queue, message)
    unacked: HashMap<u64, (String, StoredMessage)>,
}

/// A publish observed by the broker
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub message: OutboundMessage,
}

#[derive(Debug)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeKind>,
    bindings: Vec<Binding>,
    queues: HashMap<String, QueueState>,
    connections: HashMap<u64, Connection>,
    next_connection_id: u64,
    next_delivery_tag: u64,
    report_delivery_count: bool,
    fail_publishes: bool,
    refuse_connections: bool,
    published: Vec<PublishedMessage>,
    acked: Vec<DeliveryTag>,
    nacked: Vec<(DeliveryTag, bool)>,
}

impl Default for BrokerState {
    fn default() -> Self {
        Self {
            exchanges: HashMap::new(),
            bindings: Vec::new(),
            queues: HashMap::new(),
            connections: HashMap::new(),
            next_connection_id: 1,
            next_delivery_tag: 1,
            report_delivery_count: true,
            fail_publishes: false,
            refuse_connections: false,
            published: Vec::new(),
            acked: Vec::new(),
            nacked: Vec::new(),
        }
    }
}

/// Match an AMQP topic pattern against a routing key
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    fn matches(pattern: &[&str], key: &[&str]) -> bool {
        match (pattern.first(), key.first()) {
            (None, None) => true,
            (Some(&"#"), _) => {
                matches(&pattern[1..], key) || (!key.is_empty() && matches(pattern, &key[1..]))
            }
            (Some(&"*"), Some(_)) => matches(&pattern[1..], &key[1..]),
            (Some(p), Some(k)) if p == k => matches(&pattern[1..], &key[1..]),
            _ => false,
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches(&pattern, &key)
}

impl BrokerState {
    /// Queues `routing_key` reaches through `exchange`
    fn route(&self, exchange: &str, routing_key: &str) -> Vec<String> {
        if exchange == DEFAULT_EXCHANGE {
            return if self.queues.contains_key(routing_key) {
                vec![routing_key.to_string()]
            } else {
                Vec::new()
            };
        }

        let kind = self.exchanges.get(exchange).copied();
        let mut queues: Vec<String> = self
            .bindings
            .iter()
            .filter(|b| b.exchange == exchange)
            .filter(|b| match kind {
                Some(ExchangeKind::Topic) => topic_matches(&b.pattern, routing_key),
                Some(ExchangeKind::Direct) => b.pattern == routing_key,
                None => false,
            })
            .map(|b| b.queue.clone())
            .collect();
        queues.sort();
        queues.dedup();
        queues
    }

    fn enqueue(&mut self, exchange: &str, message: OutboundMessage) {
        for queue in self.route(exchange, &message.routing_key) {
            let delivery_tag = self.next_delivery_tag;
            self.next_delivery_tag += 1;
            if let Some(state) = self.queues.get_mut(&queue) {
                state.pending.push_back(StoredMessage {
                    delivery_tag,
                    message: message.clone(),
                    redelivered: false,
                    deliveries: 0,
                });
            }
        }
    }

    fn requeue(&mut self, queue: &str, mut stored: StoredMessage) {
        stored.redelivered = true;
        if let Some(state) = self.queues.get_mut(queue) {
            state.pending.push_front(stored);
        }
    }

    fn dead_letter(&mut self, queue: &str, stored: StoredMessage) {
        let target = self
            .queues
            .get(queue)
            .and_then(|state| state.dead_letter.clone());

        match target {
            Some((exchange, routing_key)) => {
                let mut message = stored.message;
                message.routing_key = routing_key;
                self.enqueue(&exchange, message);
            }
            None => debug!(queue = %queue, delivery_tag = stored.delivery_tag, "Rejected message dropped"),
        }
    }

    /// Return a connection's unacked deliveries to their queues
    fn release_unacked(&mut self, connection_id: u64) {
        let mut unacked: Vec<(String, StoredMessage)> = self
            .connections
            .get_mut(&connection_id)
            .map(|c| c.unacked.drain().map(|(_, entry)| entry).collect())
            .unwrap_or_default();

        unacked.sort_by_key(|(_, stored)| std::cmp::Reverse(stored.delivery_tag));
        for (queue, stored) in unacked {
            self.requeue(&queue, stored);
        }
    }

    fn bind(&mut self, exchange: &str, pattern: &str, queue: &str) {
        let exists = self
            .bindings
            .iter()
            .any(|b| b.exchange == exchange && b.pattern == pattern && b.queue == queue);
        if !exists {
            self.bindings.push(Binding {
                exchange: exchange.to_string(),
                pattern: pattern.to_string(),
                queue: queue.to_string(),
            });
        }
    }

    fn connection_state(&self, connection_id: u64) -> ConnectionState {
        self.connections
            .get(&connection_id)
            .map(|c| c.state)
            .unwrap_or(ConnectionState::Dropped)
    }

    fn ensure_open(&self, connection_id: u64) -> MessagingResult<()> {
        match self.connection_state(connection_id) {
            ConnectionState::Open => Ok(()),
            ConnectionState::Closed => Err(MessagingError::connection("connection closed")),
            ConnectionState::Dropped => Err(MessagingError::connection("connection lost")),
        }
    }

    /// Next deliverable message for a consumer, honouring prefetch
    fn next_delivery(&mut self, connection_id: u64, queue: &str) -> Option<InboundDelivery> {
        let report_delivery_count = self.report_delivery_count;
        let connection = self.connections.get(&connection_id)?;
        if connection.prefetch > 0 && connection.unacked.len() >= usize::from(connection.prefetch) {
            return None;
        }

        let mut stored = self.queues.get_mut(queue)?.pending.pop_front()?;
        let previous = stored.deliveries;
        stored.deliveries += 1;

        let message = &stored.message;
        let mut delivery = InboundDelivery::new(
            stored.delivery_tag,
            message.routing_key.clone(),
            message.body.clone(),
        )
        .with_redelivered(stored.redelivered);
        delivery.correlation_id = message.correlation_id.clone();
        delivery.reply_to = message.reply_to.clone();
        if report_delivery_count && previous > 0 {
            delivery = delivery.with_delivery_count(previous);
        }

        if let Some(connection) = self.connections.get_mut(&connection_id) {
            connection
                .unacked
                .insert(stored.delivery_tag, (queue.to_string(), stored));
        }
        Some(delivery)
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BrokerState>,
    notify: Notify,
}

/// In-memory broker shared by every transport connected to it
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop reporting `x-delivery-count` (classic-queue behaviour)
    pub fn without_delivery_count(self) -> Self {
        self.shared.state.lock().report_delivery_count = false;
        self
    }

    /// Open a new connection
    pub fn connect(&self) -> InMemoryTransport {
        let mut state = self.shared.state.lock();
        let connection_id = state.next_connection_id;
        state.next_connection_id += 1;
        let connection_state = if state.refuse_connections {
            ConnectionState::Dropped
        } else {
            ConnectionState::Open
        };
        state.connections.insert(
            connection_id,
            Connection {
                state: connection_state,
                prefetch: 0,
                unacked: HashMap::new(),
            },
        );

        InMemoryTransport {
            shared: self.shared.clone(),
            connection_id,
        }
    }

    /// Publish as a client would (no connection required)
    pub fn publish(&self, exchange: &str, message: OutboundMessage) {
        {
            let mut state = self.shared.state.lock();
            state.published.push(PublishedMessage {
                exchange: exchange.to_string(),
                message: message.clone(),
            });
            state.enqueue(exchange, message);
        }
        self.shared.notify.notify_waiters();
    }

    /// Simulate a broker-side connection loss for every open connection
    pub fn drop_connections(&self) {
        {
            let mut state = self.shared.state.lock();
            let open: Vec<u64> = state
                .connections
                .iter()
                .filter(|(_, c)| c.state == ConnectionState::Open)
                .map(|(id, _)| *id)
                .collect();
            for id in open {
                state.release_unacked(id);
                if let Some(connection) = state.connections.get_mut(&id) {
                    connection.state = ConnectionState::Dropped;
                }
            }
        }
        self.shared.notify.notify_waiters();
    }

    /// Make new connections fail on first use (or work again)
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.state.lock().refuse_connections = refuse;
    }

    /// Make every subsequent transport publish fail (or succeed again)
    pub fn fail_publishes(&self, fail: bool) {
        self.shared.state.lock().fail_publishes = fail;
    }

    /// Messages published to the default exchange with `routing_key`
    pub fn published_to(&self, routing_key: &str) -> Vec<OutboundMessage> {
        self.shared
            .state
            .lock()
            .published
            .iter()
            .filter(|p| p.exchange == DEFAULT_EXCHANGE && p.message.routing_key == routing_key)
            .map(|p| p.message.clone())
            .collect()
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.shared.state.lock().published.clone()
    }

    pub fn acked(&self) -> Vec<DeliveryTag> {
        self.shared.state.lock().acked.clone()
    }

    pub fn nacked(&self) -> Vec<(DeliveryTag, bool)> {
        self.shared.state.lock().nacked.clone()
    }

    /// Messages waiting in `queue` (excluding unacked deliveries)
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.shared
            .state
            .lock()
            .queues
            .get(queue)
            .map(|q| q.pending.len())
            .unwrap_or(0)
    }

    pub fn queue_exists(&self, queue: &str) -> bool {
        self.shared.state.lock().queues.contains_key(queue)
    }

    /// Patterns bound from `exchange` to `queue`
    pub fn bindings(&self, exchange: &str, queue: &str) -> Vec<String> {
        self.shared
            .state
            .lock()
            .bindings
            .iter()
            .filter(|b| b.exchange == exchange && b.queue == queue)
            .map(|b| b.pattern.clone())
            .collect()
    }

    /// Connections not yet closed or dropped
    pub fn open_connections(&self) -> usize {
        self.shared
            .state
            .lock()
            .connections
            .values()
            .filter(|c| c.state == ConnectionState::Open)
            .count()
    }

    /// Declare a plain queue (e.g. a client's reply queue)
    pub fn declare_queue(&self, queue: &str) {
        self.shared
            .state
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default();
    }
}

/// One connection to an [`InMemoryBroker`]
#[derive(Debug)]
pub struct InMemoryTransport {
    shared: Arc<Shared>,
    connection_id: u64,
}

impl InMemoryTransport {
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }
}

#[async_trait]
impl BrokerTransport for InMemoryTransport {
    async fn declare_topology(&self, topology: &Topology) -> MessagingResult<()> {
        let mut state = self.shared.state.lock();
        state.ensure_open(self.connection_id)?;

        if let Some(existing) = state.exchanges.get(&topology.exchange) {
            if *existing != ExchangeKind::Topic {
                return Err(MessagingError::topology(
                    &topology.exchange,
                    "PRECONDITION_FAILED - inequivalent arg 'type'",
                ));
            }
        }

        let dead_letter = topology
            .dead_letter
            .as_ref()
            .map(|dl| (dl.exchange.clone(), dl.routing_key.clone()));
        if let Some(existing) = state.queues.get(&topology.queue) {
            if existing.dead_letter != dead_letter {
                return Err(MessagingError::topology(
                    &topology.queue,
                    "PRECONDITION_FAILED - inequivalent arg 'x-dead-letter-exchange'",
                ));
            }
        }

        state
            .exchanges
            .insert(topology.exchange.clone(), ExchangeKind::Topic);
        if let Some(dl) = &topology.dead_letter {
            state.exchanges.insert(dl.exchange.clone(), ExchangeKind::Direct);
            state.queues.entry(dl.queue.clone()).or_default();
            state.bind(&dl.exchange, &dl.routing_key, &dl.queue);
        }

        state.queues.entry(topology.queue.clone()).or_default().dead_letter = dead_letter;

        for pattern in &topology.bindings {
            state.bind(&topology.exchange, pattern, &topology.queue);
        }

        if let Some(connection) = state.connections.get_mut(&self.connection_id) {
            connection.prefetch = topology.prefetch_count;
        }
        Ok(())
    }

    async fn start_consuming(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> MessagingResult<DeliveryStream> {
        {
            let state = self.shared.state.lock();
            state.ensure_open(self.connection_id)?;
            if !state.queues.contains_key(queue) {
                return Err(MessagingError::consume(queue, "NOT_FOUND - no queue"));
            }
        }
        debug!(queue = %queue, consumer_tag = %consumer_tag, "In-memory consumer started");

        let shared = self.shared.clone();
        let connection_id = self.connection_id;
        let queue = queue.to_string();

        let stream = futures::stream::unfold(Some(shared), move |shared| {
            let queue = queue.clone();
            async move {
                let shared = shared?;
                loop {
                    let notified = shared.notify.notified();
                    tokio::pin!(notified);
                    notified.as_mut().enable();

                    {
                        let mut state = shared.state.lock();
                        match state.connection_state(connection_id) {
                            ConnectionState::Closed => return None,
                            ConnectionState::Dropped => {
                                let error = MessagingError::consumer_closed(format!(
                                    "{queue}: connection lost"
                                ));
                                return Some((Err(error), None));
                            }
                            ConnectionState::Open => {}
                        }
                        if let Some(delivery) = state.next_delivery(connection_id, &queue) {
                            return Some((Ok(delivery), Some(Arc::clone(&shared))));
                        }
                    }

                    notified.await;
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn ack(&self, delivery_tag: DeliveryTag) -> MessagingResult<()> {
        {
            let mut state = self.shared.state.lock();
            state.ensure_open(self.connection_id)?;
            let removed = state
                .connections
                .get_mut(&self.connection_id)
                .and_then(|c| c.unacked.remove(&delivery_tag.value()));
            if removed.is_none() {
                return Err(MessagingError::ack(
                    "in_memory",
                    delivery_tag.value(),
                    "PRECONDITION_FAILED - unknown delivery tag",
                ));
            }
            state.acked.push(delivery_tag);
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn nack(&self, delivery_tag: DeliveryTag, requeue: bool) -> MessagingResult<()> {
        {
            let mut state = self.shared.state.lock();
            state.ensure_open(self.connection_id)?;
            let removed = state
                .connections
                .get_mut(&self.connection_id)
                .and_then(|c| c.unacked.remove(&delivery_tag.value()));
            let Some((queue, stored)) = removed else {
                return Err(MessagingError::nack(
                    "in_memory",
                    delivery_tag.value(),
                    "PRECONDITION_FAILED - unknown delivery tag",
                ));
            };

            state.nacked.push((delivery_tag, requeue));
            if requeue {
                state.requeue(&queue, stored);
            } else {
                state.dead_letter(&queue, stored);
            }
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn publish(&self, exchange: &str, message: OutboundMessage) -> MessagingResult<()> {
        {
            let mut state = self.shared.state.lock();
            state.ensure_open(self.connection_id)?;
            if state.fail_publishes {
                return Err(MessagingError::publish(
                    &message.routing_key,
                    "publish rejected by in-memory broker",
                ));
            }
            if exchange != DEFAULT_EXCHANGE && !state.exchanges.contains_key(exchange) {
                return Err(MessagingError::publish(
                    &message.routing_key,
                    format!("NOT_FOUND - no exchange '{exchange}'"),
                ));
            }
            state.published.push(PublishedMessage {
                exchange: exchange.to_string(),
                message: message.clone(),
            });
            state.enqueue(exchange, message);
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> MessagingResult<()> {
        {
            let mut state = self.shared.state.lock();
            if state.connection_state(self.connection_id) != ConnectionState::Open {
                return Ok(());
            }
            state.release_unacked(self.connection_id);
            if let Some(connection) = state.connections.get_mut(&self.connection_id) {
                connection.state = ConnectionState::Closed;
            }
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.state.lock().connection_state(self.connection_id) == ConnectionState::Open
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopologyConfig;
    use futures::StreamExt;
    use std::time::Duration;

    fn topology() -> Topology {
        Topology::from_config(&TopologyConfig::default())
    }

    async fn next(stream: &mut DeliveryStream) -> Option<MessagingResult<InboundDelivery>> {
        tokio::time::timeout(Duration::from_millis(200), stream.next())
            .await
            .ok()
            .flatten()
    }

    #[test]
    fn test_topic_patterns() {
        assert!(topic_matches("user.api.paciente.create", "user.api.paciente.create"));
        assert!(topic_matches("user.api.*.create", "user.api.medico.create"));
        assert!(topic_matches("user.#", "user.api.medico.create"));
        assert!(topic_matches("#", "anything.at.all"));
        assert!(topic_matches("user.api.#", "user.api"));
        assert!(!topic_matches("user.api.*", "user.api.medico.create"));
        assert!(!topic_matches("user.api.paciente.create", "user.api.paciente.update"));
    }

    #[tokio::test]
    async fn test_routes_only_bound_keys() {
        let broker = InMemoryBroker::new();
        let transport = broker.connect();
        transport.declare_topology(&topology()).await.unwrap();

        broker.publish("user-exchange", OutboundMessage::new("user.api.paciente.getAll", b"{}".to_vec()));
        broker.publish("user-exchange", OutboundMessage::new("user.other.thing", b"{}".to_vec()));

        assert_eq!(broker.queue_depth("user-api-queue"), 1);
        assert_eq!(broker.bindings("user-exchange", "user-api-queue").len(), 16);
    }

    #[tokio::test]
    async fn test_prefetch_and_requeue_keep_delivery_tag() {
        let broker = InMemoryBroker::new();
        let transport = broker.connect();
        transport.declare_topology(&topology()).await.unwrap();
        for _ in 0..2 {
            broker.publish("user-exchange", OutboundMessage::new("user.api.medico.getAll", b"{}".to_vec()));
        }

        let mut stream = transport.start_consuming("user-api-queue", "test").await.unwrap();
        let first = next(&mut stream).await.unwrap().unwrap();
        assert!(!first.redelivered);

        // prefetch 1: nothing else until the first is settled
        assert!(next(&mut stream).await.is_none());

        transport.nack(first.delivery_tag, true).await.unwrap();
        let again = next(&mut stream).await.unwrap().unwrap();
        assert_eq!(again.delivery_tag, first.delivery_tag);
        assert!(again.redelivered);
        assert_eq!(again.delivery_count, Some(1));

        transport.ack(again.delivery_tag).await.unwrap();
        let second = next(&mut stream).await.unwrap().unwrap();
        assert_ne!(second.delivery_tag, first.delivery_tag);
        assert_eq!(broker.acked(), vec![first.delivery_tag]);
    }

    #[tokio::test]
    async fn test_reject_without_requeue_dead_letters() {
        let broker = InMemoryBroker::new();
        let transport = broker.connect();
        transport.declare_topology(&topology()).await.unwrap();
        broker.publish("user-exchange", OutboundMessage::new("user.api.cuidador.delete", b"{}".to_vec()));

        let mut stream = transport.start_consuming("user-api-queue", "test").await.unwrap();
        let delivery = next(&mut stream).await.unwrap().unwrap();
        transport.nack(delivery.delivery_tag, false).await.unwrap();

        assert_eq!(broker.queue_depth("user-api-queue"), 0);
        assert_eq!(broker.queue_depth("user-api-queue.dlq"), 1);
        assert_eq!(broker.nacked(), vec![(delivery.delivery_tag, false)]);
    }

    #[tokio::test]
    async fn test_dropped_connection_fails_stream_and_requeues() {
        let broker = InMemoryBroker::new();
        let transport = broker.connect();
        transport.declare_topology(&topology()).await.unwrap();
        broker.publish("user-exchange", OutboundMessage::new("user.api.paciente.getAll", b"{}".to_vec()));

        let mut stream = transport.start_consuming("user-api-queue", "test").await.unwrap();
        let delivery = next(&mut stream).await.unwrap().unwrap();

        broker.drop_connections();
        let failure = next(&mut stream).await.unwrap();
        assert!(matches!(failure, Err(MessagingError::ConsumerClosed { .. })));
        assert!(next(&mut stream).await.is_none());
        assert!(transport.ack(delivery.delivery_tag).await.is_err());
        assert_eq!(broker.queue_depth("user-api-queue"), 1);

        let reconnected = broker.connect();
        reconnected.declare_topology(&topology()).await.unwrap();
        let mut stream = reconnected.start_consuming("user-api-queue", "test").await.unwrap();
        let redelivered = next(&mut stream).await.unwrap().unwrap();
        assert!(redelivered.redelivered);
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let broker = InMemoryBroker::new();
        let transport = broker.connect();
        transport.declare_topology(&topology()).await.unwrap();
        let mut stream = transport.start_consuming("user-api-queue", "test").await.unwrap();

        transport.close().await.unwrap();
        assert!(next(&mut stream).await.is_none());
        assert!(!transport.is_connected());
        assert_eq!(broker.open_connections(), 0);
        assert!(transport.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_default_exchange_publish_and_failure_injection() {
        let broker = InMemoryBroker::new();
        broker.declare_queue("amq.gen-reply");
        let transport = broker.connect();

        let reply = OutboundMessage::json("amq.gen-reply", b"{\"success\":true}".to_vec())
            .with_correlation_id("c-1");
        transport.publish("", reply.clone()).await.unwrap();
        assert_eq!(broker.published_to("amq.gen-reply"), vec![reply.clone()]);
        assert_eq!(broker.queue_depth("amq.gen-reply"), 1);

        broker.fail_publishes(true);
        assert!(matches!(
            transport.publish("", reply).await,
            Err(MessagingError::Publish { .. })
        ));
    }
}
