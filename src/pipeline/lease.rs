//! Per-tenant step mutual exclusion.
//!
//! The job checkpoint is shared mutable state addressed by tenant; two
//! overlapping steps could double-advance its cursor. The lease set
//! serializes steps per tenant within this process: overlapping callers are
//! rejected and retry once the holder finishes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// In-process lease set, one slot per tenant.
#[derive(Debug, Default)]
pub struct TenantLeases {
    active: Mutex<HashSet<String>>,
}

impl TenantLeases {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Try to take the lease for a tenant. Returns `None` while another
    /// holder is live; the returned guard releases on drop.
    pub fn try_acquire(self: &Arc<Self>, tenant_id: &str) -> Option<LeaseGuard> {
        let mut active = self.active.lock().ok()?;
        if active.contains(tenant_id) {
            return None;
        }
        active.insert(tenant_id.to_string());
        Some(LeaseGuard {
            tenant_id: tenant_id.to_string(),
            leases: Arc::clone(self),
        })
    }

    /// Whether a lease is currently held for the tenant.
    pub fn is_held(&self, tenant_id: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(tenant_id))
            .unwrap_or(false)
    }

    fn release(&self, tenant_id: &str) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(tenant_id);
        }
    }
}

/// Held lease for one tenant; dropping it releases the slot.
#[derive(Debug)]
pub struct LeaseGuard {
    tenant_id: String,
    leases: Arc<TenantLeases>,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.leases.release(&self.tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_acquire_is_rejected() {
        let leases = TenantLeases::new();

        let guard = leases.try_acquire("tenant-a");
        assert!(guard.is_some());
        assert!(leases.is_held("tenant-a"));

        assert!(leases.try_acquire("tenant-a").is_none());
        // Other tenants are unaffected.
        assert!(leases.try_acquire("tenant-b").is_some());
    }

    #[test]
    fn test_drop_releases_lease() {
        let leases = TenantLeases::new();

        {
            let _guard = leases.try_acquire("tenant-a").unwrap();
            assert!(leases.is_held("tenant-a"));
        }

        assert!(!leases.is_held("tenant-a"));
        assert!(leases.try_acquire("tenant-a").is_some());
    }
}
