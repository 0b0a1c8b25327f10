//! Time-bounded memoization of language-model answers.
//!
//! Entries are keyed by the exact question text. An entry is dropped once it
//! is older than the TTL, or when the cache is full and a new answer has to
//! be stored (oldest-inserted first).
//!
//! The lock is never held while an answer is being computed, so slow lookups
//! for different questions run side by side. Two concurrent misses for the
//! same question both call the model; the later insert wins.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default time-to-live (10 minutes).
pub const DEFAULT_TTL_SECS: u64 = 600;

struct CachedAnswer {
    answer: String,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedAnswer>,
    /// Keys in insertion order. Front is the oldest.
    order: VecDeque<String>,
}

impl CacheState {
    fn purge_expired(&mut self, now: Instant, ttl: Duration) {
        while let Some(key) = self.order.front() {
            let expired = self
                .entries
                .get(key)
                .is_none_or(|e| now.duration_since(e.inserted_at) >= ttl);
            if !expired {
                break;
            }
            if let Some(key) = self.order.pop_front() {
                self.entries.remove(&key);
            }
        }
    }

    fn insert(&mut self, key: &str, answer: String, now: Instant, max_entries: usize) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
        while self.entries.len() >= max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            debug!("Evicting oldest cached answer");
            self.entries.remove(&oldest);
        }
        self.entries.insert(key.to_string(), CachedAnswer { answer, inserted_at: now });
        self.order.push_back(key.to_string());
    }
}

/// Process-wide answer cache.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Return the cached answer for `question`, or run `compute` and store its
    /// result.
    ///
    /// Failed computations are passed through and never cached.
    pub async fn lookup_or_compute<F, Fut, E>(&self, question: &str, compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(answer) = self.get(question).await {
            info!("📦 Using cached answer");
            return Ok(answer);
        }

        let answer = compute().await?;

        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.purge_expired(now, self.ttl);
        state.insert(question, answer.clone(), now, self.max_entries);
        Ok(answer)
    }

    async fn get(&self, question: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        state.purge_expired(Instant::now(), self.ttl);
        state.entries.get(question).map(|e| e.answer.clone())
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let mut state = self.state.lock().await;
        state.purge_expired(Instant::now(), self.ttl);
        state.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tokio::time::sleep;

    async fn ask(cache: &ResponseCache, q: &str, calls: &AtomicUsize) -> String {
        cache
            .lookup_or_compute(q, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(format!("answer to {q}"))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let cache = ResponseCache::default();
        let calls = AtomicUsize::new(0);

        assert_eq!(ask(&cache, "¿qué tal?", &calls).await, "answer to ¿qué tal?");
        assert_eq!(ask(&cache, "¿qué tal?", &calls).await, "answer to ¿qué tal?");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_is_exact_text() {
        let cache = ResponseCache::default();
        let calls = AtomicUsize::new(0);

        ask(&cache, "hola", &calls).await;
        ask(&cache, "Hola", &calls).await;
        ask(&cache, "hola ", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_expired_entry_is_recomputed() {
        let cache = ResponseCache::new(10, Duration::from_millis(30));
        let calls = AtomicUsize::new(0);

        ask(&cache, "q", &calls).await;
        sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.len().await, 0);
        ask(&cache, "q", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_inserted() {
        let cache = ResponseCache::new(3, Duration::from_secs(600));
        let calls = AtomicUsize::new(0);

        for q in ["a", "b", "c"] {
            ask(&cache, q, &calls).await;
        }
        // Reading "a" does not refresh its position
        ask(&cache, "a", &calls).await;
        ask(&cache, "d", &calls).await;
        assert_eq!(cache.len().await, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        ask(&cache, "b", &calls).await;
        ask(&cache, "c", &calls).await;
        ask(&cache, "d", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        ask(&cache, "a", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        let cache = ResponseCache::new(5, Duration::from_secs(600));
        let calls = AtomicUsize::new(0);

        for i in 0..50 {
            ask(&cache, &format!("q{i}"), &calls).await;
            assert!(cache.len().await <= 5);
        }
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = ResponseCache::default();
        let calls = AtomicUsize::new(0);

        let result = cache
            .lookup_or_compute("q", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>("upstream down".to_string())
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);

        ask(&cache, "q", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_slow_compute_does_not_block_other_keys() {
        let cache = Arc::new(ResponseCache::default());
        let release = Arc::new(Notify::new());

        let slow = {
            let cache = cache.clone();
            let release = release.clone();
            tokio::spawn(async move {
                cache
                    .lookup_or_compute("slow", || async move {
                        release.notified().await;
                        Ok::<_, String>("late".to_string())
                    })
                    .await
            })
        };

        // Completes while "slow" is still in flight
        let fast = tokio::time::timeout(
            Duration::from_secs(1),
            cache.lookup_or_compute("fast", || async { Ok::<_, String>("quick".to_string()) }),
        )
        .await
        .expect("fast lookup blocked by slow one");
        assert_eq!(fast.unwrap(), "quick");

        release.notify_one();
        assert_eq!(slow.await.unwrap().unwrap(), "late");
        assert_eq!(cache.len().await, 2);
    }
}
