//! Exponential backoff between reconnect attempts.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Delay schedule: `initial * multiplier^n`, capped at `max_delay_ms`
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            config: config.clone(),
            attempts: 0,
        }
    }

    /// Attempts handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next attempt, or `None` once `max_attempts` is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempts >= self.config.max_attempts {
            return None;
        }

        let exponent = i32::try_from(self.attempts).unwrap_or(i32::MAX);
        let scaled = self.config.initial_delay_ms as f64 * self.config.multiplier.powi(exponent);
        let delay_ms = scaled.min(self.config.max_delay_ms as f64) as u64;

        self.attempts = self.attempts.saturating_add(1);
        Some(Duration::from_millis(delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            multiplier: 2.0,
            max_attempts,
        }
    }

    #[test]
    fn test_delays_grow_and_cap() {
        let mut backoff = ReconnectBackoff::new(&config(0));
        let delays: Vec<u64> = (0..6)
            .filter_map(|_| backoff.next_delay())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_max_attempts_exhausts() {
        let mut backoff = ReconnectBackoff::new(&config(2));
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert_eq!(backoff.next_delay(), None);
        assert_eq!(backoff.attempts(), 2);
    }

    #[test]
    fn test_unbounded_never_overflows() {
        let mut backoff = ReconnectBackoff::new(&config(0));
        for _ in 0..2_000 {
            assert!(backoff.next_delay().unwrap() <= Duration::from_millis(1_000));
        }
    }
}
