//! # System Constants
//!
//! Fixed names and defaults for the user-service RPC topology.
//!
//! These values form the wire contract shared with every publisher of user
//! requests. Configuration can override the names for isolated deployments
//! (tests, staging vhosts), but the defaults must match what clients publish to.

/// Topology defaults
pub mod topology {
    /// Topic exchange requests are published to
    pub const EXCHANGE_NAME: &str = "user-exchange";

    /// Durable queue the consumer reads from
    pub const QUEUE_NAME: &str = "user-api-queue";

    /// First two routing-key segments (`<namespace>.<surface>`)
    pub const ROUTING_NAMESPACE: &str = "user.api";

    /// Unacknowledged deliveries allowed per consumer
    pub const PREFETCH_COUNT: u16 = 1;

    /// Suffix of the dead-letter exchange declared next to the queue
    pub const DEAD_LETTER_EXCHANGE_SUFFIX: &str = ".dlx";

    /// Suffix of the dead-letter queue declared next to the queue
    pub const DEAD_LETTER_QUEUE_SUFFIX: &str = ".dlq";

    /// Connection name reported to the broker management UI
    pub const CONNECTION_NAME: &str = "user-rpc-consumer";

    /// Consumer tag used on `basic.consume`
    pub const CONSUMER_TAG: &str = "user-api-consumer";

    /// AMQP default exchange; routes directly to the queue named by the routing key
    pub const DEFAULT_EXCHANGE: &str = "";
}

/// Delivery-handling defaults
pub mod delivery {
    /// Attempts before a failing delivery is dead-lettered
    pub const MAX_DELIVERY_ATTEMPTS: u32 = 5;

    /// Upper bound on a single handler execution
    pub const HANDLER_TIMEOUT_SECONDS: u64 = 30;

    /// Grace period for the in-flight delivery during shutdown
    pub const SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

    /// Broker header carrying the delivery count on quorum queues
    pub const DELIVERY_COUNT_HEADER: &str = "x-delivery-count";

    /// Correlation ids remembered by the redelivery tracker
    pub const REDELIVERY_TRACKER_CAPACITY: usize = 10_000;
}

/// Domain constants shared with the user service
pub mod domain {
    /// Role id assigned to every doctor on creation
    pub const ROL_MEDICO: i32 = 2;

    /// Status given to newly created users
    pub const ESTADO_ACTIVO: &str = "activo";
}
