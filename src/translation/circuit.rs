//! Per-instance circuit breaker.
//!
//! An instance is open (skipped) while less than the cooldown has elapsed
//! since its last recorded failure. There is no half-open probing: once the
//! cooldown passes the instance is simply eligible again. Expired entries
//! are pruned whenever eligibility is computed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const CIRCUIT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

pub struct CircuitBreaker {
    failures: Mutex<HashMap<String, Instant>>,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
            cooldown,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_failure(&self, instance: &str) {
        self.record_failure_at(instance, Instant::now());
    }

    pub fn record_failure_at(&self, instance: &str, at: Instant) {
        self.lock().insert(instance.to_string(), at);
    }

    pub fn is_open(&self, instance: &str) -> bool {
        self.is_open_at(instance, Instant::now())
    }

    pub fn is_open_at(&self, instance: &str, now: Instant) -> bool {
        self.lock()
            .get(instance)
            .map(|failed_at| now.saturating_duration_since(*failed_at) < self.cooldown)
            .unwrap_or(false)
    }

    /// Instances whose circuit is closed, in their original order.
    pub fn eligible<'a>(&self, instances: &'a [String]) -> Vec<&'a str> {
        self.eligible_at(instances, Instant::now())
    }

    pub fn eligible_at<'a>(&self, instances: &'a [String], now: Instant) -> Vec<&'a str> {
        let mut failures = self.lock();
        failures.retain(|_, failed_at| now.saturating_duration_since(*failed_at) < self.cooldown);

        instances
            .iter()
            .map(String::as_str)
            .filter(|instance| !failures.contains_key(*instance))
            .collect()
    }

    /// Number of instances with a recorded, possibly expired, failure.
    #[cfg(test)]
    fn tracked_failures(&self) -> usize {
        self.lock().len()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CIRCUIT_COOLDOWN)
    }
}
