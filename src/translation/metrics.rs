//! Counters for translation traffic, owned by a `TranslationManager`.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// `translate_text` calls
    requests: AtomicUsize,

    /// Calls answered by some provider
    translated: AtomicUsize,

    /// Calls where every provider failed or none was configured
    exhausted: AtomicUsize,

    /// Individual provider invocations
    provider_attempts: AtomicUsize,

    /// Provider invocations that errored, reported failure or returned untrusted output
    provider_failures: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated(&self) {
        self.translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attempt(&self) {
        self.provider_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_attempts(&self) -> usize {
        self.provider_attempts.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> MetricsReport {
        let requests = self.requests.load(Ordering::Relaxed);
        let translated = self.translated.load(Ordering::Relaxed);
        let success_rate = if requests > 0 {
            (translated as f64 / requests as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            requests,
            translated,
            exhausted: self.exhausted.load(Ordering::Relaxed),
            provider_attempts: self.provider_attempts(),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            success_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub requests: usize,
    pub translated: usize,
    pub exhausted: usize,
    pub provider_attempts: usize,
    pub provider_failures: usize,
    /// Percentage of requests answered by a provider (0-100)
    pub success_rate: f64,
}
