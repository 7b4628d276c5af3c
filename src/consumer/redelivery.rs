//! # Redelivery Policy
//!
//! Decides whether a failed delivery is requeued or dead-lettered.
//!
//! The attempt number comes from the broker's `x-delivery-count` header when
//! present (quorum queues). Classic queues only report a `redelivered` flag,
//! so failures are also counted locally per publisher correlation id. A
//! redelivery without a header and without a correlation id cannot be counted
//! and is always requeued.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::constants::delivery::REDELIVERY_TRACKER_CAPACITY;
use crate::messaging::InboundDelivery;

/// What to do with a delivery whose handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Nack with requeue
    Requeue { attempt: u32 },
    /// Nack without requeue; the broker routes it to the dead-letter exchange
    DeadLetter { attempt: u32 },
}

#[derive(Debug, Default)]
struct TrackerState {
    failures: HashMap<String, (u32, u64)>,
    order: VecDeque<(String, u64)>,
    sequence: u64,
}

/// Bounded failure counter keyed by correlation id, oldest entries evicted first
#[derive(Debug)]
pub struct RedeliveryTracker {
    capacity: usize,
    state: Mutex<TrackerState>,
}

impl Default for RedeliveryTracker {
    fn default() -> Self {
        Self::with_capacity(REDELIVERY_TRACKER_CAPACITY)
    }
}

impl RedeliveryTracker {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Record a failed attempt and return the attempt number
    ///
    /// A first delivery (`redelivered == false`) restarts the count at 1.
    pub fn record_failure(&self, key: &str, redelivered: bool) -> u32 {
        let mut state = self.state.lock();
        state.sequence += 1;
        let sequence = state.sequence;

        let previous = if redelivered {
            // Missing history on a redelivery still means one earlier attempt.
            state.failures.get(key).map_or(1, |(count, _)| *count)
        } else {
            0
        };
        let attempt = previous.saturating_add(1);

        state.failures.insert(key.to_string(), (attempt, sequence));
        state.order.push_back((key.to_string(), sequence));

        while state.failures.len() > self.capacity {
            let Some((oldest, seq)) = state.order.pop_front() else {
                break;
            };
            if state.failures.get(&oldest).is_some_and(|(_, s)| *s == seq) {
                state.failures.remove(&oldest);
            }
        }
        if state.order.len() > self.capacity.saturating_mul(2) {
            let TrackerState { failures, order, .. } = &mut *state;
            order.retain(|(key, seq)| failures.get(key).is_some_and(|(_, s)| s == seq));
        }

        attempt
    }

    pub fn forget(&self, key: &str) {
        self.state.lock().failures.remove(key);
    }

    pub fn len(&self) -> usize {
        self.state.lock().failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Attempt cap plus dead-lettering
#[derive(Debug, Default)]
pub struct RedeliveryPolicy {
    max_attempts: Option<u32>,
    tracker: RedeliveryTracker,
}

impl RedeliveryPolicy {
    /// `None` requeues failures forever
    pub fn new(max_attempts: Option<u32>) -> Self {
        Self {
            max_attempts,
            tracker: RedeliveryTracker::default(),
        }
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Classify a failed delivery
    pub fn on_failure(&self, delivery: &InboundDelivery) -> FailureDisposition {
        let publisher_id = delivery.correlation_id.as_deref().filter(|id| !id.is_empty());

        let counted = match (delivery.delivery_count, publisher_id) {
            (Some(previous), _) => Some(previous.saturating_add(1)),
            (None, Some(id)) => Some(self.tracker.record_failure(id, delivery.redelivered)),
            (None, None) if !delivery.redelivered => Some(1),
            (None, None) => None,
        };

        match (self.max_attempts, counted) {
            (Some(max), Some(attempt)) if attempt >= max => {
                if let Some(id) = publisher_id {
                    self.tracker.forget(id);
                }
                FailureDisposition::DeadLetter { attempt }
            }
            (_, Some(attempt)) => FailureDisposition::Requeue { attempt },
            (_, None) => FailureDisposition::Requeue { attempt: 2 },
        }
    }

    /// Drop local history for a delivery that was acked
    pub fn on_settled(&self, delivery: &InboundDelivery) {
        if let Some(id) = delivery.correlation_id.as_deref().filter(|id| !id.is_empty()) {
            self.tracker.forget(id);
        }
    }

    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(correlation_id: Option<&str>, redelivered: bool) -> InboundDelivery {
        let delivery = InboundDelivery::new(1, "user.api.paciente.create", b"{".to_vec())
            .with_redelivered(redelivered);
        match correlation_id {
            Some(id) => delivery.with_correlation_id(id),
            None => delivery,
        }
    }

    #[test]
    fn test_header_count_drives_dead_lettering() {
        let policy = RedeliveryPolicy::new(Some(3));
        let first = delivery(None, false);
        assert_eq!(policy.on_failure(&first), FailureDisposition::Requeue { attempt: 1 });

        let third = delivery(None, true).with_delivery_count(2);
        assert_eq!(policy.on_failure(&third), FailureDisposition::DeadLetter { attempt: 3 });
    }

    #[test]
    fn test_local_tracking_without_header() {
        let policy = RedeliveryPolicy::new(Some(3));

        assert_eq!(
            policy.on_failure(&delivery(Some("c-1"), false)),
            FailureDisposition::Requeue { attempt: 1 }
        );
        assert_eq!(
            policy.on_failure(&delivery(Some("c-1"), true)),
            FailureDisposition::Requeue { attempt: 2 }
        );
        assert_eq!(
            policy.on_failure(&delivery(Some("c-1"), true)),
            FailureDisposition::DeadLetter { attempt: 3 }
        );
        assert_eq!(policy.tracked(), 0);
    }

    #[test]
    fn test_uncountable_delivery_is_always_requeued() {
        let policy = RedeliveryPolicy::new(Some(1));
        assert_eq!(
            policy.on_failure(&delivery(None, true)),
            FailureDisposition::Requeue { attempt: 2 }
        );
    }

    #[test]
    fn test_unlimited_never_dead_letters() {
        let policy = RedeliveryPolicy::new(None);
        let delivery = delivery(Some("c-1"), true).with_delivery_count(500);
        assert_eq!(policy.on_failure(&delivery), FailureDisposition::Requeue { attempt: 501 });
    }

    #[test]
    fn test_settled_delivery_is_forgotten() {
        let policy = RedeliveryPolicy::new(Some(5));
        let failed = delivery(Some("c-9"), false);
        policy.on_failure(&failed);
        assert_eq!(policy.tracked(), 1);

        policy.on_settled(&failed);
        assert_eq!(policy.tracked(), 0);
    }

    #[test]
    fn test_tracker_evicts_oldest() {
        let tracker = RedeliveryTracker::with_capacity(2);
        tracker.record_failure("a", false);
        tracker.record_failure("b", false);
        tracker.record_failure("c", false);
        assert_eq!(tracker.len(), 2);

        // "a" was evicted, so its history restarts from the redelivery minimum
        assert_eq!(tracker.record_failure("a", true), 2);
        assert_eq!(tracker.record_failure("c", true), 2);
    }
}
