//! Per-caller request limits.

use crate::config::LimitConfig;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window counter keyed by caller.
///
/// Each key may be admitted `times` times per `window`; the window restarts
/// on the first request after it elapses.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    window: Duration,
    times: u32,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(name: &'static str, limit: LimitConfig) -> Self {
        Self {
            name,
            window: limit.window,
            times: limit.times,
            windows: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Record a request for `key`, returning whether it is admitted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });

        if now.saturating_duration_since(window.started) >= self.window {
            window.started = now;
            window.hits = 0;
        }

        if window.hits >= self.times {
            tracing::debug!(limiter = self.name, key, "rate limit exceeded");
            return false;
        }
        window.hits += 1;
        true
    }
}
