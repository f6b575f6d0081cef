//! TTL + FIFO response cache keyed by a conversation-aware fingerprint.
//!
//! Values are stored as JSON so one cache can hold any serializable
//! response type. Expiry is checked on read; past capacity the oldest
//! insertion is evicted.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

pub const DEFAULT_CAPACITY: usize = 100;

/// How many prior conversation turns feed the fingerprint.
const FINGERPRINT_TURNS: usize = 2;

static PROCESS_HITS: AtomicU64 = AtomicU64::new(0);
static PROCESS_MISSES: AtomicU64 = AtomicU64::new(0);

/// Hit and miss totals across every cache in this process.
pub fn process_counters() -> (u64, u64) {
    (
        PROCESS_HITS.load(Ordering::Relaxed),
        PROCESS_MISSES.load(Ordering::Relaxed),
    )
}

/// Cache key for an utterance in the context of the last two turns.
pub fn fingerprint(utterance: &str, recent_turns: &[String]) -> String {
    let normalized = utterance
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let start = recent_turns.len().saturating_sub(FINGERPRINT_TURNS);
    for turn in &recent_turns[start..] {
        hasher.update([0x1f]);
        hasher.update(turn.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct CachedValue {
    value: serde_json::Value,
    cached_at: DateTime<Utc>,
    ttl_secs: u64,
}

impl CachedValue {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX));
        now.signed_duration_since(self.cached_at) >= ttl
    }
}

pub struct ResponseCache {
    entries: HashMap<String, CachedValue>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
        }
    }

    pub fn get<V: DeserializeOwned>(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Look up `key` as of `now`. Expired and undecodable entries are
    /// removed and count as misses.
    pub fn get_at<V: DeserializeOwned>(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let Some(entry) = self.entries.get(key) else {
            self.record_miss();
            return None;
        };

        if entry.is_expired(now) {
            debug!(key, "Cache entry expired");
            self.remove(key);
            self.record_miss();
            return None;
        }

        match serde_json::from_value::<V>(entry.value.clone()) {
            Ok(value) => {
                self.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt cache entry");
                self.remove(key);
                self.record_miss();
                None
            }
        }
    }

    pub fn insert<V: Serialize>(&mut self, key: &str, value: &V, ttl_secs: u64) {
        self.insert_at(key, value, ttl_secs, Utc::now());
    }

    pub fn insert_at<V: Serialize>(&mut self, key: &str, value: &V, ttl_secs: u64, now: DateTime<Utc>) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Response not cacheable");
                return;
            }
        };

        if self.entries.contains_key(key) {
            self.order.retain(|k| k != key);
        }
        while self.entries.len() >= self.capacity && !self.entries.contains_key(key) {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            debug!(key = %oldest, "Evicting oldest cache entry");
            self.entries.remove(&oldest);
        }

        self.order.push_back(key.to_string());
        self.entries.insert(
            key.to_string(),
            CachedValue {
                value,
                cached_at: now,
                ttl_secs,
            },
        );
    }

    pub async fn get_or_compute<V, F, Fut>(&mut self, key: &str, ttl_secs: u64, compute: F) -> V
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        self.get_or_compute_at(key, ttl_secs, Utc::now(), compute).await
    }

    pub async fn get_or_compute_at<V, F, Fut>(
        &mut self,
        key: &str,
        ttl_secs: u64,
        now: DateTime<Utc>,
        compute: F,
    ) -> V
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(hit) = self.get_at(key, now) {
            return hit;
        }
        let value = compute().await;
        self.insert_at(key, &value, ttl_secs, now);
        value
    }

    /// Like `get_or_compute`, but errors pass through uncached.
    pub async fn try_get_or_compute<V, E, F, Fut>(
        &mut self,
        key: &str,
        ttl_secs: u64,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.try_get_or_compute_at(key, ttl_secs, Utc::now(), compute).await
    }

    pub async fn try_get_or_compute_at<V, E, F, Fut>(
        &mut self,
        key: &str,
        ttl_secs: u64,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get_at(key, now) {
            return Ok(hit);
        }
        let value = compute().await?;
        self.insert_at(key, &value, ttl_secs, now);
        Ok(value)
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }

    fn record_hit(&mut self) {
        self.hits += 1;
        PROCESS_HITS.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&mut self) {
        self.misses += 1;
        PROCESS_MISSES.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fingerprint_normalizes_and_uses_last_two_turns() {
        let a = fingerprint("Partners  in London", &[]);
        let b = fingerprint("  partners in london ", &[]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let turns = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        assert_eq!(
            fingerprint("what about oslo", &turns),
            fingerprint("what about oslo", &turns[1..])
        );
        assert_ne!(
            fingerprint("what about oslo", &turns),
            fingerprint("what about oslo", &[])
        );
    }

    #[tokio::test]
    async fn ttl_expiry_counts_as_miss() {
        let mut cache = ResponseCache::default();
        let first: u32 = cache.get_or_compute_at("k", 60, t0(), || async { 1 }).await;
        assert_eq!(first, 1);

        let cached: u32 = cache
            .get_or_compute_at("k", 60, t0() + Duration::seconds(59), || async { 2 })
            .await;
        assert_eq!(cached, 1);

        let recomputed: u32 = cache
            .get_or_compute_at("k", 60, t0() + Duration::seconds(60), || async { 3 })
            .await;
        assert_eq!(recomputed, 3);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 2, 1));
        assert!((stats.hit_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn fifo_eviction_past_capacity() {
        let mut cache = ResponseCache::new(2);
        cache.insert_at("a", &1, 60, t0());
        cache.insert_at("b", &2, 60, t0());
        cache.insert_at("c", &3, 60, t0());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at::<i32>("a", t0()), None);
        assert_eq!(cache.get_at::<i32>("b", t0()), Some(2));
        assert_eq!(cache.get_at::<i32>("c", t0()), Some(3));
    }

    #[test]
    fn reinsert_refreshes_position() {
        let mut cache = ResponseCache::new(2);
        cache.insert_at("a", &1, 60, t0());
        cache.insert_at("b", &2, 60, t0());
        cache.insert_at("a", &10, 60, t0());
        cache.insert_at("c", &3, 60, t0());

        assert_eq!(cache.get_at::<i32>("a", t0()), Some(10));
        assert_eq!(cache.get_at::<i32>("b", t0()), None);
    }

    #[test]
    fn corrupt_entry_is_discarded() {
        let mut cache = ResponseCache::default();
        cache.insert_at("k", &"not a number", 60, t0());

        assert_eq!(cache.get_at::<u64>("k", t0()), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let mut cache = ResponseCache::default();
        let failed: Result<u32, String> = cache
            .try_get_or_compute_at("k", 60, t0(), || async { Err("store down".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ok: Result<u32, String> = cache
            .try_get_or_compute_at("k", 60, t0(), || async { Ok(7) })
            .await;
        assert_eq!(ok, Ok(7));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn process_counters_accumulate() {
        let (hits_before, misses_before) = process_counters();
        let mut cache = ResponseCache::default();
        cache.insert_at("k", &1, 60, t0());
        let _ = cache.get_at::<i32>("k", t0());
        let _ = cache.get_at::<i32>("missing", t0());

        let (hits, misses) = process_counters();
        assert!(hits > hits_before);
        assert!(misses > misses_before);
    }
}
