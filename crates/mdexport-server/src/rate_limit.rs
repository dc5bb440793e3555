//! Sliding-window rate limiting.
//!
//! Counters live behind the [`CounterStore`] trait so that a shared store
//! can replace the in-memory one when the server runs on several hosts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mdexport_config::RateLimitConfig;

/// Number of tracked keys above which expired keys are purged.
const PURGE_THRESHOLD: usize = 1024;

/// Storage for per-key hit logs.
pub trait CounterStore: Send + Sync {
    /// Record a hit for `key` unless `limit` hits already fall inside the
    /// window ending at `now`.
    ///
    /// Returns the hits left in the window after this one, or how long to
    /// wait before the oldest counted hit leaves the window.
    fn hit(&self, key: &str, limit: u32, window: Duration, now: Instant) -> Result<u32, Duration>;
}

/// Process-local store keeping a timestamp log per key.
///
/// Entries expire lazily: a key's log is pruned when the key is hit, and
/// keys with only expired hits are dropped once the map grows large.
///
/// # Panics
///
/// Panics if the internal mutex is poisoned.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    logs: Mutex<HashMap<String, Vec<Instant>>>,
}

impl InMemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.logs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CounterStore for InMemoryCounterStore {
    fn hit(&self, key: &str, limit: u32, window: Duration, now: Instant) -> Result<u32, Duration> {
        let mut logs = self.logs.lock().unwrap();

        if logs.len() > PURGE_THRESHOLD {
            logs.retain(|_, hits| hits.iter().any(|t| now.duration_since(*t) < window));
        }

        let hits = logs.entry(key.to_owned()).or_default();
        hits.retain(|t| now.duration_since(*t) < window);

        let limit = limit as usize;
        if hits.len() >= limit {
            let retry_after = hits
                .first()
                .map_or(window, |oldest| window.saturating_sub(now.duration_since(*oldest)));
            return Err(retry_after);
        }

        hits.push(now);
        Ok(u32::try_from(limit - hits.len()).unwrap_or(u32::MAX))
    }
}

/// Per-client limiter for one endpoint.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    store: Arc<dyn CounterStore>,
    enabled: bool,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(store: Arc<dyn CounterStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            limit: config.pdf_requests,
            window: config.window(),
        }
    }

    /// Count a request from `client`. Returns the retry delay when limited.
    pub(crate) fn check(&self, client: &str) -> Result<(), Duration> {
        if !self.enabled {
            return Ok(());
        }
        self.store
            .hit(client, self.limit, self.window, Instant::now())
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(InMemoryCounterStore: Send, Sync);

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_allows_up_to_limit() {
        let store = InMemoryCounterStore::new();
        let now = Instant::now();
        assert_eq!(store.hit("a", 3, WINDOW, now), Ok(2));
        assert_eq!(store.hit("a", 3, WINDOW, now), Ok(1));
        assert_eq!(store.hit("a", 3, WINDOW, now), Ok(0));
        assert_eq!(store.hit("a", 3, WINDOW, now), Err(WINDOW));
    }

    #[test]
    fn test_keys_are_independent() {
        let store = InMemoryCounterStore::new();
        let now = Instant::now();
        assert!(store.hit("a", 1, WINDOW, now).is_ok());
        assert!(store.hit("a", 1, WINDOW, now).is_err());
        assert!(store.hit("b", 1, WINDOW, now).is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_window_slides() {
        let store = InMemoryCounterStore::new();
        let start = Instant::now();
        assert!(store.hit("a", 2, WINDOW, start).is_ok());
        assert!(store.hit("a", 2, WINDOW, start + Duration::from_secs(30)).is_ok());

        let limited = store.hit("a", 2, WINDOW, start + Duration::from_secs(45));
        assert_eq!(limited, Err(Duration::from_secs(15)));

        // The first hit has left the window.
        assert!(store.hit("a", 2, WINDOW, start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_expired_keys_purged() {
        let store = InMemoryCounterStore::new();
        let start = Instant::now();
        for i in 0..=PURGE_THRESHOLD {
            store.hit(&format!("k{i}"), 1, WINDOW, start).unwrap();
        }
        assert_eq!(store.len(), PURGE_THRESHOLD + 1);

        store.hit("late", 1, WINDOW, start + WINDOW * 2).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_zero_limit_always_limited() {
        let store = InMemoryCounterStore::new();
        assert!(store.hit("a", 0, WINDOW, Instant::now()).is_err());
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let config = RateLimitConfig {
            enabled: false,
            pdf_requests: 0,
            window_secs: 60,
        };
        let limiter = RateLimiter::new(Arc::new(InMemoryCounterStore::new()), &config);
        for _ in 0..5 {
            assert!(limiter.check("a").is_ok());
        }
    }
}
