// Rate sheet cache: keeps vehicle pricing around while the user plays with the selection
// Every change of date, hour or add-on reprices, and none of them should refetch the car.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::rate_sheet::RateSheet;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub eviction_count: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            default_ttl_seconds: 300,
        }
    }
}

struct CacheEntry {
    rates: RateSheet,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

pub struct RateSheetCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    stats: CacheStats,
}

impl RateSheetCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    // Unpriceable sheets are never cached so a fixed vehicle record shows up on the next lookup
    pub fn store(&self, car_id: &str, rates: RateSheet, ttl: Option<Duration>) -> bool {
        if !rates.is_priceable() {
            debug!(car_id, "Not caching unpriceable rate sheet");
            return false;
        }

        if !self.entries.contains_key(car_id) && self.entries.len() >= self.config.max_entries {
            self.evict_oldest();
        }

        let ttl = ttl.unwrap_or_else(|| Duration::from_secs(self.config.default_ttl_seconds));
        self.entries.insert(
            car_id.to_string(),
            CacheEntry {
                rates,
                created_at: Instant::now(),
                ttl,
            },
        );
        true
    }

    pub fn get(&self, car_id: &str) -> Option<RateSheet> {
        let expired = match self.entries.get(car_id) {
            Some(entry) if !entry.is_expired() => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                return Some(entry.rates.clone());
            }
            Some(_) => true,
            None => false,
        };

        // The read guard above is gone by now, so removing can't deadlock the shard
        if expired && self.entries.remove(car_id).is_some() {
            self.stats.expired_count.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
        None
    }

    // Drops one car, or everything when `car_id` is None
    pub fn invalidate(&self, car_id: Option<&str>) -> usize {
        match car_id {
            Some(car_id) => usize::from(self.entries.remove(car_id).is_some()),
            None => {
                let count = self.entries.len();
                self.entries.clear();
                count
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

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            expired_count: self.stats.expired_count.load(Ordering::SeqCst),
            eviction_count: self.stats.eviction_count.load(Ordering::SeqCst),
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.key().clone());

        if let Some(oldest) = oldest {
            if self.entries.remove(&oldest).is_some() {
                self.stats.eviction_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl Default for RateSheetCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
