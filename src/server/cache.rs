//! In-memory cache for per-tenant report aggregates.
//!
//! Derived views (category summaries) are cheap to rebuild but get hit on
//! every poll, so entries live behind a TTL and are evicted when a tenant's
//! classification job completes.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::pipeline::CompletionHook;

/// Default TTL for cached aggregates (5 minutes).
const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A cached value with expiration time.
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn get(&self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

/// Cache for per-tenant report aggregates.
pub struct ReportCache {
    summaries: RwLock<HashMap<String, CacheEntry<serde_json::Value>>>,
    ttl: Duration,
}

impl ReportCache {
    /// Create a new report cache with default TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a new report cache with custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            summaries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get the cached summary for a tenant, or None if expired/missing.
    pub fn get_summary(&self, tenant_id: &str) -> Option<serde_json::Value> {
        self.summaries
            .read()
            .ok()
            .and_then(|guard| guard.get(tenant_id).and_then(|e| e.get()))
    }

    /// Set the summary for a tenant.
    pub fn set_summary(&self, tenant_id: &str, value: serde_json::Value) {
        if let Ok(mut guard) = self.summaries.write() {
            guard.insert(tenant_id.to_string(), CacheEntry::new(value, self.ttl));
            // Prune expired entries occasionally (when cache grows large)
            if guard.len() > 100 {
                guard.retain(|_, entry| !entry.is_expired());
            }
        }
    }

    /// Evict every cached view for the tenant; returns how many were dropped.
    pub fn invalidate(&self, tenant_id: &str) -> usize {
        match self.summaries.write() {
            Ok(mut guard) => guard.remove(tenant_id).map(|_| 1).unwrap_or(0),
            Err(_) => 0,
        }
    }
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionHook for ReportCache {
    fn invalidate(&self, tenant_id: &str) -> usize {
        ReportCache::invalidate(self, tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_invalidate() {
        let cache = ReportCache::new();
        assert!(cache.get_summary("t1").is_none());

        cache.set_summary("t1", json!({"total": 3}));
        assert_eq!(cache.get_summary("t1").unwrap()["total"], 3);

        assert_eq!(cache.invalidate("t1"), 1);
        assert!(cache.get_summary("t1").is_none());
        // Invalidating again evicts nothing.
        assert_eq!(cache.invalidate("t1"), 0);
    }

    #[test]
    fn test_entries_expire() {
        let cache = ReportCache::with_ttl(Duration::from_millis(10));
        cache.set_summary("t1", json!({"total": 1}));
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get_summary("t1").is_none());
    }

    #[test]
    fn test_tenants_are_isolated() {
        let cache = ReportCache::new();
        cache.set_summary("t1", json!(1));
        cache.set_summary("t2", json!(2));
        cache.invalidate("t1");
        assert!(cache.get_summary("t1").is_none());
        assert_eq!(cache.get_summary("t2").unwrap(), json!(2));
    }
}
