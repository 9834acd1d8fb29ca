//! Predicate cache: `(entity_type, property, value)` → shared record bitmap.
//!
//! Backed by a moka sync cache:
//! - **Idle expiry**: entries nobody reads for `idle_ttl` are dropped.
//! - **Single flight**: concurrent misses on one key run one lookup and all
//!   callers receive its result. Different keys never wait on each other.
//! - **Stale-while-refresh**: a hit on an entry older than `refresh_after`
//!   returns the current bitmap at once and recomputes it on a
//!   `boolfilter_refresh` thread. A `DashMap` of in-flight keys keeps that to
//!   one refresh per key. A failed refresh leaves the old bitmap in place.
//! - **Invalidation**: `invalidate_all` bumps an epoch; a refresh that started
//!   under an older epoch drops its result instead of writing it back.
//!
//! Lookup failures never reach the caller: they are logged and the predicate
//! resolves to an empty bitmap.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed, Ordering::SeqCst};
use std::sync::Arc;
use std::time::{Duration, Instant};

use boolfilter_dsl::{Value, ValueMatch};
use dashmap::DashMap;
use moka::sync::Cache;
use roaring::RoaringTreemap;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::LookupError;
use crate::lookup::ValueLookup;

const REFRESH_THREAD_NAME: &str = "boolfilter_refresh";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Predicate {
        entity_type: String,
        property: String,
        value: Value,
    },
    /// Every record of an entity type.
    Universe { entity_type: String },
}

impl CacheKey {
    pub fn predicate(entity_type: &str, property: &str, value: &Value) -> Self {
        CacheKey::Predicate {
            entity_type: entity_type.to_string(),
            property: property.to_string(),
            value: value.clone(),
        }
    }

    pub fn universe(entity_type: &str) -> Self {
        CacheKey::Universe {
            entity_type: entity_type.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Predicate {
                entity_type,
                property,
                value,
            } => write!(f, "{entity_type}.{property}={value}"),
            CacheKey::Universe { entity_type } => write!(f, "{entity_type}.*"),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedBitmap {
    bitmap: Arc<RoaringTreemap>,
    refreshed_at: Instant,
}

impl CachedBitmap {
    fn fresh(bitmap: RoaringTreemap) -> Self {
        Self {
            bitmap: Arc::new(bitmap),
            refreshed_at: Instant::now(),
        }
    }
}

#[derive(Debug, Default)]
struct AtomicCacheStats {
    loads: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups run for missing keys (successful or not).
    pub loads: u64,
    /// Completed background refreshes.
    pub refreshes: u64,
    /// Failed loads plus failed refreshes.
    pub failures: u64,
}

pub struct PredicateCache {
    lookup: Arc<dyn ValueLookup>,
    cache: Cache<CacheKey, CachedBitmap>,
    refresh_after: Duration,
    in_flight: Arc<DashMap<CacheKey, ()>>,
    epoch: Arc<AtomicU64>,
    stats: Arc<AtomicCacheStats>,
}

impl fmt::Debug for PredicateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateCache")
            .field("entry_count", &self.cache.entry_count())
            .field("refresh_after", &self.refresh_after)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl PredicateCache {
    pub fn new(lookup: Arc<dyn ValueLookup>, config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().time_to_idle(config.idle_ttl);
        if let Some(max) = config.max_capacity {
            builder = builder.max_capacity(max);
        }
        Self {
            lookup,
            cache: builder.build(),
            refresh_after: config.refresh_after,
            in_flight: Arc::new(DashMap::new()),
            epoch: Arc::new(AtomicU64::new(0)),
            stats: Arc::new(AtomicCacheStats::default()),
        }
    }

    /// Records of `entity_type` whose `property` matches `value`.
    pub fn resolve(&self, entity_type: &str, property: &str, value: &Value) -> Arc<RoaringTreemap> {
        self.get(CacheKey::predicate(entity_type, property, value))
    }

    /// All records of `entity_type`.
    pub fn universe(&self, entity_type: &str) -> Arc<RoaringTreemap> {
        self.get(CacheKey::universe(entity_type))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            loads: self.stats.loads.load(Relaxed),
            refreshes: self.stats.refreshes.load(Relaxed),
            failures: self.stats.failures.load(Relaxed),
        }
    }

    /// Drop every entry. Refreshes already running discard their results.
    pub fn invalidate_all(&self) {
        self.epoch.fetch_add(1, SeqCst);
        self.cache.invalidate_all();
    }

    /// Background refreshes currently running.
    pub fn refreshes_in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    fn get(&self, key: CacheKey) -> Arc<RoaringTreemap> {
        let mut loaded = false;
        let entry = self.cache.try_get_with(key.clone(), || {
            loaded = true;
            self.stats.loads.fetch_add(1, Relaxed);
            match compute(self.lookup.as_ref(), &key) {
                Ok(bitmap) => {
                    debug!(key = %key, records = bitmap.len(), "loaded predicate");
                    Ok(CachedBitmap::fresh(bitmap))
                }
                Err(err) => {
                    self.stats.failures.fetch_add(1, Relaxed);
                    warn!(key = %key, error = %err, "predicate lookup failed; resolving to no records");
                    Err(err)
                }
            }
        });

        match entry {
            Ok(entry) => {
                if !loaded && entry.refreshed_at.elapsed() >= self.refresh_after {
                    self.schedule_refresh(key);
                }
                entry.bitmap
            }
            // Already logged by the caller that ran the lookup.
            Err(_) => Arc::new(RoaringTreemap::new()),
        }
    }

    fn schedule_refresh(&self, key: CacheKey) {
        if self.in_flight.insert(key.clone(), ()).is_some() {
            return;
        }

        let lookup = Arc::clone(&self.lookup);
        let cache = self.cache.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let stats = Arc::clone(&self.stats);
        let epoch = Arc::clone(&self.epoch);
        let started_in = epoch.load(SeqCst);
        let task_key = key.clone();

        let spawned = std::thread::Builder::new()
            .name(REFRESH_THREAD_NAME.to_string())
            .spawn(move || {
                match compute(lookup.as_ref(), &task_key) {
                    Ok(_) if epoch.load(SeqCst) != started_in => {
                        debug!(key = %task_key, "cache invalidated during refresh; dropping result");
                    }
                    Ok(bitmap) => {
                        debug!(key = %task_key, records = bitmap.len(), "refreshed predicate");
                        cache.insert(task_key.clone(), CachedBitmap::fresh(bitmap));
                        // An invalidation between the check and the insert.
                        if epoch.load(SeqCst) != started_in {
                            cache.invalidate(&task_key);
                        } else {
                            stats.refreshes.fetch_add(1, Relaxed);
                        }
                    }
                    Err(err) => {
                        stats.failures.fetch_add(1, Relaxed);
                        warn!(key = %task_key, error = %err, "predicate refresh failed; keeping previous records");
                    }
                }
                in_flight.remove(&task_key);
            });

        if let Err(err) = spawned {
            warn!(key = %key, error = %err, "failed to spawn predicate refresh");
            self.in_flight.remove(&key);
        }
    }
}

fn compute(lookup: &dyn ValueLookup, key: &CacheKey) -> Result<RoaringTreemap, LookupError> {
    match key {
        CacheKey::Predicate {
            entity_type,
            property,
            value,
        } => {
            let matcher = ValueMatch::classify(value)?;
            lookup.lookup(entity_type, property, &matcher)
        }
        CacheKey::Universe { entity_type } => lookup.all_records(entity_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn cache_over(store: MemoryStore) -> PredicateCache {
        PredicateCache::new(Arc::new(store), &CacheConfig::default())
    }

    #[test]
    fn hits_share_the_same_bitmap() {
        let mut store = MemoryStore::new();
        store.insert("Doc", 1, [("lang", Value::from("en"))]);
        store.insert("Doc", 2, [("lang", Value::from("de"))]);
        let cache = cache_over(store);

        let first = cache.resolve("Doc", "lang", &Value::from("en"));
        let second = cache.resolve("Doc", "lang", &Value::from("en"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(cache.stats().loads, 1);
    }

    #[test]
    fn keys_distinguish_entity_type_and_value_kind() {
        assert_ne!(
            CacheKey::predicate("A", "p", &Value::from("1")),
            CacheKey::predicate("A", "p", &Value::Int(1))
        );
        assert_ne!(
            CacheKey::predicate("A", "p", &Value::Int(1)),
            CacheKey::predicate("B", "p", &Value::Int(1))
        );
        assert_eq!(CacheKey::universe("A").to_string(), "A.*");
    }

    #[test]
    fn failures_resolve_empty_and_are_not_cached() {
        let mut store = MemoryStore::new();
        store.insert("Doc", 1, [("size", Value::Int(3))]);
        let cache = cache_over(store);

        // No range index on `size`.
        assert!(cache.resolve("Doc", "size", &Value::from("[1,5]")).is_empty());
        assert!(cache.resolve("Doc", "size", &Value::from("[1,5]")).is_empty());
        let stats = cache.stats();
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.loads, 2);
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn invalidate_all_forces_reload() {
        let mut store = MemoryStore::new();
        store.insert("Doc", 1, [("lang", Value::from("en"))]);
        let cache = cache_over(store);

        cache.universe("Doc");
        cache.invalidate_all();
        assert_eq!(cache.universe("Doc").len(), 1);
        assert_eq!(cache.stats().loads, 2);
    }
}
