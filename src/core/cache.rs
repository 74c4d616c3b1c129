// src/core/cache.rs
//! Tagged read cache.
//!
//! Reads are stored under a key and a set of tags; writes invalidate tags,
//! which drops every entry carrying them. Each tag also has a generation
//! counter so that a read which started before an invalidation cannot store
//! its (now stale) result afterwards. Counters are dropped in bulk once there
//! are more of them than cache entries; pruned tags then share one floor
//! generation.

use anyhow::Result;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tag generations observed when a cached read began
#[derive(Debug, Clone)]
pub struct ReadTicket {
    generations: Vec<(String, u64)>,
}

impl ReadTicket {
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.generations.iter().map(|(tag, _)| tag.as_str())
    }
}

pub trait TagCache: Send + Sync {
    /// Cached value for `key`, if present and fresh
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Register a read under `tags` before it touches storage
    fn begin_read(&self, tags: &[String]) -> ReadTicket;

    /// Store a read result. Returns false when a tag of the ticket was
    /// invalidated since `begin_read`, in which case nothing is kept.
    fn put(&self, key: String, value: serde_json::Value, ticket: ReadTicket) -> bool;

    /// Drop every entry carrying `tag`. Completes before returning.
    fn invalidate_tag(&self, tag: &str);

    fn stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Read-through helper: serve `key` from the cache or run `load` and store
/// its result under `tags`.
pub async fn cached<T, F, Fut>(
    cache: &dyn TagCache,
    key: String,
    tags: Vec<String>,
    load: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(value) = cache.get(&key) {
        match serde_json::from_value(value) {
            Ok(hit) => {
                debug!("Cache hit: {}", key);
                return Ok(hit);
            }
            Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
        }
    }

    let ticket = cache.begin_read(&tags);
    let fresh = load().await?;

    match serde_json::to_value(&fresh) {
        Ok(value) => {
            if !cache.put(key.clone(), value, ticket) {
                debug!("Skipped caching {}: invalidated during read", key);
            }
        }
        Err(e) => warn!("Failed to serialize cache entry {}: {}", key, e),
    }

    Ok(fresh)
}

#[derive(Debug, Clone)]
struct CachedEntry {
    value: serde_json::Value,
    tags: Vec<String>,
    cached_at: Instant,
    seq: u64,
}

impl CachedEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// In-process tag cache backed by `DashMap`
pub struct InMemoryTagCache {
    entries: DashMap<String, CachedEntry>,
    generations: DashMap<String, u64>,
    /// Generation of any tag missing from `generations`
    floor: AtomicU64,
    clock: AtomicU64,
    /// Taken exclusively only while `generations` is pruned
    prune_lock: RwLock<()>,
    next_seq: AtomicU64,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryTagCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
    pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_TTL, Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_config(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            floor: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            prune_lock: RwLock::new(()),
            next_seq: AtomicU64::new(0),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.prune_lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self, tag: &str) -> u64 {
        self.generations
            .get(tag)
            .map(|g| *g)
            .unwrap_or_else(|| self.floor.load(Ordering::SeqCst))
    }

    fn ticket_is_current(&self, ticket: &ReadTicket) -> bool {
        let _shared = self.shared();
        ticket
            .generations
            .iter()
            .all(|(tag, seen)| self.generation(tag) == *seen)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    /// Forget every tag generation. Any tag read afterwards reports the
    /// floor, the latest generation handed out so far.
    fn prune_generations(&self) {
        let _exclusive = self
            .prune_lock
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.generations.len() <= self.max_entries {
            return;
        }

        self.floor
            .store(self.clock.load(Ordering::SeqCst), Ordering::SeqCst);
        self.generations.clear();
        debug!("Pruned cache tag generations");
    }

    pub fn stats(&self) -> CacheStats {
        let (total, expired) = self.entries.iter().fold((0, 0), |(total, expired), entry| {
            let is_expired = entry.value().is_expired(self.ttl);
            (total + 1, expired + usize::from(is_expired))
        });

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }
}

impl Default for InMemoryTagCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TagCache for InMemoryTagCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn begin_read(&self, tags: &[String]) -> ReadTicket {
        let _shared = self.shared();
        ReadTicket {
            generations: tags
                .iter()
                .map(|tag| (tag.clone(), self.generation(tag)))
                .collect(),
        }
    }

    fn put(&self, key: String, value: serde_json::Value, ticket: ReadTicket) -> bool {
        if !self.ticket_is_current(&ticket) {
            return false;
        }

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let tags = ticket.tags().map(str::to_string).collect();
        self.entries.insert(
            key.clone(),
            CachedEntry {
                value,
                tags,
                cached_at: Instant::now(),
                seq,
            },
        );

        // An invalidation may have landed between the check and the insert.
        if !self.ticket_is_current(&ticket) {
            self.entries.remove_if(&key, |_, entry| entry.seq == seq);
            return false;
        }

        true
    }

    fn invalidate_tag(&self, tag: &str) {
        {
            let _shared = self.shared();
            let generation = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
            self.generations.insert(tag.to_string(), generation);
        }
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        debug!("Invalidated cache tag: {}", tag);

        if self.generations.len() > self.max_entries {
            self.prune_generations();
        }
    }

    fn stats(&self) -> Option<CacheStats> {
        Some(InMemoryTagCache::stats(self))
    }
}

/// Cache that stores nothing; every read goes to storage
pub struct NoopTagCache;

impl TagCache for NoopTagCache {
    fn get(&self, _key: &str) -> Option<serde_json::Value> {
        None
    }

    fn begin_read(&self, tags: &[String]) -> ReadTicket {
        ReadTicket {
            generations: tags.iter().map(|tag| (tag.clone(), 0)).collect(),
        }
    }

    fn put(&self, _key: String, _value: serde_json::Value, _ticket: ReadTicket) -> bool {
        false
    }

    fn invalidate_tag(&self, _tag: &str) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_put_and_get() {
        let cache = InMemoryTagCache::new();
        let ticket = cache.begin_read(&tags(&["user:1"]));
        assert!(cache.put("k".to_string(), json!([1, 2]), ticket));
        assert_eq!(cache.get("k"), Some(json!([1, 2])));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_invalidate_tag_drops_only_tagged_entries() {
        let cache = InMemoryTagCache::new();
        let t1 = cache.begin_read(&tags(&["user:1", "global"]));
        cache.put("list:1".to_string(), json!(1), t1);
        let t2 = cache.begin_read(&tags(&["user:2", "global"]));
        cache.put("list:2".to_string(), json!(2), t2);

        cache.invalidate_tag("user:1");

        assert_eq!(cache.get("list:1"), None);
        assert_eq!(cache.get("list:2"), Some(json!(2)));

        cache.invalidate_tag("global");
        assert_eq!(cache.get("list:2"), None);
    }

    #[test]
    fn test_read_racing_invalidation_is_not_stored() {
        let cache = InMemoryTagCache::new();
        let ticket = cache.begin_read(&tags(&["id:7"]));

        // A write lands while the read is still in flight.
        cache.invalidate_tag("id:7");

        assert!(!cache.put("record:7".to_string(), json!("stale"), ticket));
        assert_eq!(cache.get("record:7"), None);

        // A read started after the write caches normally.
        let ticket = cache.begin_read(&tags(&["id:7"]));
        assert!(cache.put("record:7".to_string(), json!("fresh"), ticket));
        assert_eq!(cache.get("record:7"), Some(json!("fresh")));
    }

    #[test]
    fn test_ttl_expiration() {
        let cache = InMemoryTagCache::with_config(Duration::from_millis(30), 100);
        let ticket = cache.begin_read(&tags(&["t"]));
        cache.put("k".to_string(), json!(true), ticket);

        std::thread::sleep(Duration::from_millis(60));

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_max_entries_evicts_oldest() {
        let cache = InMemoryTagCache::with_config(Duration::from_secs(60), 2);
        for key in ["a", "b", "c"] {
            let ticket = cache.begin_read(&tags(&["t"]));
            cache.put(key.to_string(), json!(key), ticket);
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!("b")));
        assert_eq!(cache.get("c"), Some(json!("c")));
        assert_eq!(cache.stats().active_entries, 2);
    }

    #[test]
    fn test_stats_with_zero_ttl() {
        let cache = InMemoryTagCache::with_config(Duration::ZERO, 10);
        for key in ["a", "b", "c"] {
            let ticket = cache.begin_read(&tags(&["t"]));
            cache.put(key.to_string(), json!(key), ticket);
        }
        std::thread::sleep(Duration::from_millis(1));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.expired_entries, 3);
        assert_eq!(stats.active_entries, 0);
    }

    #[test]
    fn test_tag_generations_stay_bounded() {
        let cache = InMemoryTagCache::with_config(Duration::from_secs(60), 4);
        for i in 0..100 {
            cache.invalidate_tag(&format!("id:{}", i));
            assert!(cache.generations.len() <= 4);
        }
    }

    #[test]
    fn test_invalidation_is_not_lost_when_generations_are_pruned() {
        let cache = InMemoryTagCache::with_config(Duration::from_secs(60), 4);
        let stale = cache.begin_read(&tags(&["id:7", "user:1"]));

        cache.invalidate_tag("id:7");
        for i in 0..10 {
            cache.invalidate_tag(&format!("user:{}", i + 100));
        }

        assert!(!cache.put("record:7".to_string(), json!("stale"), stale));
        assert_eq!(cache.get("record:7"), None);

        let fresh = cache.begin_read(&tags(&["id:7", "user:1"]));
        assert!(cache.put("record:7".to_string(), json!("fresh"), fresh));
        assert_eq!(cache.get("record:7"), Some(json!("fresh")));
    }

    #[tokio::test]
    async fn test_cached_loads_once() {
        let cache = InMemoryTagCache::new();
        let calls = AtomicU64::new(0);

        for _ in 0..3 {
            let value: Vec<u32> = cached(&cache, "k".to_string(), tags(&["t"]), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1, 2, 3])
            })
            .await
            .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate_tag("t");
        let _: Vec<u32> = cached(&cache, "k".to_string(), tags(&["t"]), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![4])
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_noop_cache_always_loads() {
        let cache = NoopTagCache;
        let calls = AtomicU64::new(0);
        for _ in 0..2 {
            let _: u8 = cached(&cache, "k".to_string(), tags(&["t"]), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
