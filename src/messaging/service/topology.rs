//! # Broker Topology
//!
//! Exchange, queue and bindings the consumer declares before it starts
//! consuming. Declaration is idempotent on the broker side, so the same
//! topology is declared again after every reconnect.

use crate::config::TopologyConfig;
use crate::constants::topology::{DEAD_LETTER_EXCHANGE_SUFFIX, DEAD_LETTER_QUEUE_SUFFIX};
use crate::messaging::routing::binding_keys;

/// Direct exchange + queue receiving rejected deliveries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterTopology {
    pub exchange: String,
    pub queue: String,
    /// Routing key rejected messages are forwarded with (the main queue name)
    pub routing_key: String,
}

impl DeadLetterTopology {
    pub fn for_queue(queue: &str) -> Self {
        Self {
            exchange: format!("{queue}{DEAD_LETTER_EXCHANGE_SUFFIX}"),
            queue: format!("{queue}{DEAD_LETTER_QUEUE_SUFFIX}"),
            routing_key: queue.to_string(),
        }
    }
}

/// Everything declared at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Durable topic exchange
    pub exchange: String,
    /// Durable, non-exclusive queue
    pub queue: String,
    /// Routing keys binding `queue` to `exchange`
    pub bindings: Vec<String>,
    pub prefetch_count: u16,
    pub dead_letter: Option<DeadLetterTopology>,
}

impl Topology {
    pub fn from_config(config: &TopologyConfig) -> Self {
        Self {
            exchange: config.exchange.clone(),
            queue: config.queue.clone(),
            bindings: binding_keys(&config.routing_namespace),
            prefetch_count: config.prefetch_count,
            dead_letter: config
                .dead_letter_enabled
                .then(|| DeadLetterTopology::for_queue(&config.queue)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology() {
        let topology = Topology::from_config(&TopologyConfig::default());

        assert_eq!(topology.exchange, "user-exchange");
        assert_eq!(topology.queue, "user-api-queue");
        assert_eq!(topology.prefetch_count, 1);
        assert!(topology
            .bindings
            .contains(&"user.api.paciente.create".to_string()));

        let dead_letter = topology.dead_letter.unwrap();
        assert_eq!(dead_letter.exchange, "user-api-queue.dlx");
        assert_eq!(dead_letter.queue, "user-api-queue.dlq");
        assert_eq!(dead_letter.routing_key, "user-api-queue");
    }

    #[test]
    fn test_dead_letter_can_be_disabled() {
        let config = TopologyConfig {
            dead_letter_enabled: false,
            routing_namespace: "tenant.rpc".to_string(),
            ..Default::default()
        };
        let topology = Topology::from_config(&config);

        assert!(topology.dead_letter.is_none());
        assert!(topology.bindings.iter().all(|b| b.starts_with("tenant.rpc.")));
    }
}
