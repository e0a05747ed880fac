//! Bounded in-memory cache of provider results.
//!
//! Entries never expire on a timer. Once the cache holds more than its
//! capacity, the oldest inserted entry is evicted (insertion order, not
//! recency of use).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    target_language: String,
}

impl CacheKey {
    /// Key on the exact source text.
    pub fn exact(text: &str, target_language: &str) -> Self {
        Self {
            text: text.to_string(),
            target_language: target_language.to_string(),
        }
    }

    /// Key on the first `chars` characters of the source text. Long strings
    /// sharing a prefix collide.
    pub fn prefix(text: &str, target_language: &str, chars: usize) -> Self {
        Self {
            text: text.chars().take(chars).collect(),
            target_language: target_language.to_string(),
        }
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, String>,
    order: VecDeque<CacheKey>,
}

pub struct TranslationCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let value = self.lock().entries.get(key).cloned();
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        value
    }

    pub fn insert(&self, key: CacheKey, translated_text: String) {
        let mut inner = self.lock();
        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = translated_text;
            return;
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, translated_text);

        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
