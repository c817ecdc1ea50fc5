//! Fixed-window admission control for expensive classification routes.
//!
//! Each `(tenant, route)` pair gets its own window counter, bounding how
//! often a caller can trigger classifier spend. Checks run before any work:
//! a denied request costs nothing downstream.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

/// Default request budget per window.
const DEFAULT_MAX_REQUESTS: u32 = 30;
/// Default window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Prune stale keys once the map grows past this many entries.
const PRUNE_THRESHOLD: usize = 1024;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Denied; the caller may retry after the given duration.
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

/// Fixed-window counter keyed by `(tenant, route)`.
#[derive(Debug)]
pub struct RouteRateLimiter {
    config: RateLimitConfig,
    windows: RwLock<HashMap<String, WindowState>>,
}

impl RouteRateLimiter {
    /// Create a limiter with the default config.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a limiter with a custom config.
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    fn key(tenant_id: &str, route: &str) -> String {
        format!("{}:{}", tenant_id, route)
    }

    /// Check whether a request for `(tenant, route)` is admitted, counting
    /// it against the window if so.
    pub async fn check(&self, tenant_id: &str, route: &str) -> RateDecision {
        let now = Instant::now();
        let window = self.config.window;
        let mut windows = self.windows.write().await;

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, state| now.duration_since(state.window_start) < window);
        }

        let state = windows
            .entry(Self::key(tenant_id, route))
            .or_insert_with(|| WindowState {
                window_start: now,
                count: 0,
            });

        if now.duration_since(state.window_start) >= window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count < self.config.max_requests {
            state.count += 1;
            RateDecision::Allowed
        } else {
            let retry_after = window.saturating_sub(now.duration_since(state.window_start));
            debug!(
                "rate limited {} on {} (retry in {:?})",
                tenant_id, route, retry_after
            );
            RateDecision::Limited { retry_after }
        }
    }

    /// Number of live `(tenant, route)` windows.
    pub async fn active_keys(&self) -> usize {
        self.windows.read().await.len()
    }
}

impl Default for RouteRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
