// Provider response cache
// Wraps any adapter and remembers its successful payloads per search, so
// repeated searches within the TTL skip the remote call. Failures are never
// cached.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{AdapterError, ProviderAdapter};
use crate::search_params::{SearchParameters, TripKind};
use crate::supplier::RawPayload;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub total_lookups: AtomicUsize,
    pub average_lookup_time_ns: AtomicU64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub eviction_count: usize,
    pub expired_count: usize,
    pub total_lookups: usize,
    pub average_lookup_time_ns: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    LeastRecentlyUsed,
    LeastFrequentlyUsed,
    TimeToLive,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl_seconds: u64,
    pub eviction_policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl_seconds: 300,
            eviction_policy: EvictionPolicy::LeastRecentlyUsed,
        }
    }
}

struct CacheEntry {
    payload: RawPayload,
    created_at: Instant,
    ttl: Duration,
    access_count: usize,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct CachedAdapter {
    inner: Arc<dyn ProviderAdapter>,
    entries: DashMap<String, CacheEntry>,
    config: RwLock<CacheConfig>,
    stats: CacheStats,
}

impl CachedAdapter {
    pub fn new(inner: Arc<dyn ProviderAdapter>, config: CacheConfig) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            config: RwLock::new(config),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            total_lookups: self.stats.total_lookups.load(Ordering::SeqCst),
            average_lookup_time_ns: self.stats.average_lookup_time_ns.load(Ordering::SeqCst),
        }
    }

    pub fn set_eviction_policy(&self, policy: EvictionPolicy) {
        self.config.write().eviction_policy = policy;
    }

    /// Drops every entry for the destination (case-insensitive), or all
    /// entries when `destination` is None. Returns how many were removed.
    pub fn invalidate(&self, destination: Option<&str>) -> usize {
        let destination = destination.map(str::to_lowercase);
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                let parts: Vec<&str> = entry.key().split(':').collect();
                destination
                    .as_deref()
                    .map_or(true, |d| parts.get(2) == Some(&d))
            })
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter()
            .filter(|key| self.entries.remove(key).is_some())
            .count()
    }

    // Shrinking evicts entries by the current policy until the cache fits
    pub fn resize(&self, max_entries: usize) {
        self.config.write().max_entries = max_entries;
        while self.entries.len() > max_entries {
            if !self.evict_one() {
                break;
            }
        }
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let purged = before.saturating_sub(self.entries.len());
        self.stats.expired_count.fetch_add(purged, Ordering::SeqCst);
        purged
    }

    fn lookup(&self, key: &str) -> Option<RawPayload> {
        let started = Instant::now();
        self.stats.total_lookups.fetch_add(1, Ordering::SeqCst);

        let found = match self.entries.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                // Release the shard before removing
                drop(entry);
                self.entries.remove(key);
                self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
                None
            }
            Some(mut entry) => {
                entry.access_count += 1;
                entry.last_accessed = Instant::now();
                Some(entry.payload.clone())
            }
            None => None,
        };

        match found {
            Some(_) => self.stats.hit_count.fetch_add(1, Ordering::SeqCst),
            None => self.stats.miss_count.fetch_add(1, Ordering::SeqCst),
        };
        self.store_lookup_time(started);
        found
    }

    fn store(&self, key: String, payload: RawPayload) {
        let (max_entries, ttl) = {
            let config = self.config.read();
            (config.max_entries, Duration::from_secs(config.default_ttl_seconds))
        };
        if max_entries == 0 {
            return;
        }

        if !self.entries.contains_key(&key) {
            while self.entries.len() >= max_entries {
                if !self.evict_one() {
                    break;
                }
            }
        }

        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                payload,
                created_at: now,
                ttl,
                access_count: 0,
                last_accessed: now,
            },
        );
    }

    fn evict_one(&self) -> bool {
        let policy = self.config.read().eviction_policy;
        let victim = match policy {
            EvictionPolicy::LeastRecentlyUsed => self
                .entries
                .iter()
                .min_by_key(|e| e.value().last_accessed)
                .map(|e| e.key().clone()),
            EvictionPolicy::LeastFrequentlyUsed => self
                .entries
                .iter()
                .min_by_key(|e| (e.value().access_count, e.value().last_accessed))
                .map(|e| e.key().clone()),
            EvictionPolicy::TimeToLive => self
                .entries
                .iter()
                .min_by_key(|e| e.value().created_at)
                .map(|e| e.key().clone()),
        };

        match victim {
            Some(key) => {
                self.entries.remove(&key);
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(provider = %self.inner.name(), key = %key, "evicted cache entry");
                true
            }
            None => false,
        }
    }

    fn store_lookup_time(&self, started: Instant) {
        let duration_ns = started.elapsed().as_nanos() as u64;
        let total_lookups = self.stats.total_lookups.load(Ordering::SeqCst) as u64;
        let current_avg = self.stats.average_lookup_time_ns.load(Ordering::SeqCst);

        let new_avg = if total_lookups <= 1 {
            duration_ns
        } else {
            (current_avg * (total_lookups - 1) + duration_ns) / total_lookups
        };
        self.stats
            .average_lookup_time_ns
            .store(new_avg, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderAdapter for CachedAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> TripKind {
        self.inner.kind()
    }

    async fn search(&self, params: &SearchParameters) -> Result<RawPayload, AdapterError> {
        let key = params.cache_key();
        if let Some(payload) = self.lookup(&key) {
            tracing::debug!(provider = %self.inner.name(), key = %key, "cache hit");
            return Ok(payload);
        }

        let payload = self.inner.search(params).await?;
        self.store(key, payload.clone());
        Ok(payload)
    }
}
