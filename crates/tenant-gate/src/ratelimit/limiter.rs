//! Fixed-window rate limiting engine

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::constants::MAX_RETRY_AFTER_SECS;

/// Counting bucket for one key.
///
/// Only ever touched while the owning `DashMap` shard is locked.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    window: Duration,
    count: u64,
}

impl Bucket {
    const fn new(now: Instant, window: Duration) -> Self {
        Self {
            window_start: now,
            window,
            count: 0,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) >= self.window
    }

    /// Window ended more than one window-duration ago
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) >= self.window.saturating_mul(2)
    }

    fn reset_in(&self, now: Instant) -> Duration {
        self.window.saturating_sub(now.saturating_duration_since(self.window_start))
    }
}

/// Outcome of a single admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl Decision {
    /// Seconds until the window resets, rounded up and clamped to `[1, 86400]`
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let millis = (self.reset_at - Utc::now()).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).clamp(1, MAX_RETRY_AFTER_SECS)
    }

    /// Reset instant as Unix epoch seconds
    #[must_use]
    pub fn reset_epoch_secs(&self) -> i64 {
        self.reset_at.timestamp()
    }
}

/// Fixed-window request counter keyed by an arbitrary identity.
///
/// A window opens on the first request for a key and admits up to `limit`
/// requests. The first request after the window elapses starts a fresh window
/// with the count discarded, so bursts of up to twice the nominal rate are
/// possible across a window boundary.
///
/// Buckets live in a sharded map: a decision locks only the shard that holds
/// the key, so distinct keys do not contend on a single lock. Cloning is cheap
/// and clones share state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    buckets: Arc<DashMap<String, Bucket>>,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Create an engine; `name` labels its log lines and metrics
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            buckets: Arc::new(DashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Count one request against `key` and decide whether to admit it.
    ///
    /// Denied requests do not advance the count, so it never exceeds `limit`.
    pub fn allow(&self, key: &str, limit: u32, window: Duration) -> Decision {
        let now = Instant::now();

        let mut bucket = match self.buckets.get_mut(key) {
            Some(bucket) => bucket,
            None => self
                .buckets
                .entry(key.to_owned())
                .or_insert_with(|| Bucket::new(now, window)),
        };

        if bucket.is_expired(now) {
            *bucket = Bucket::new(now, window);
        }

        let allowed = bucket.count < u64::from(limit);
        if allowed {
            bucket.count += 1;
        }

        let remaining = u64::from(limit).saturating_sub(bucket.count) as u32;
        let reset_in = bucket.reset_in(now);
        drop(bucket);

        // windows past chrono's range report the latest representable instant
        let reset_at = TimeDelta::from_std(reset_in)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        if !allowed {
            tracing::debug!(limiter = self.name, key, limit, "Rate limit exceeded");
        }

        Decision {
            allowed,
            limit,
            remaining,
            reset_at,
        }
    }

    /// Drop buckets whose window ended more than one window-duration ago.
    ///
    /// Returns the number of evicted buckets.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.buckets.retain(|_, bucket| {
            let keep = !bucket.is_stale(now);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Number of tracked keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The task runs until [`RateLimiter::shutdown`] is called.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = limiter.sweep();
                        if evicted > 0 {
                            tracing::debug!(
                                limiter = limiter.name,
                                evicted,
                                remaining = limiter.len(),
                                "Evicted stale rate limit buckets"
                            );
                        }
                        #[cfg(feature = "metrics")]
                        crate::observability::set_rate_limit_buckets(limiter.name, limiter.len());
                    }
                    () = shutdown.cancelled() => {
                        tracing::debug!(limiter = limiter.name, "Rate limit sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the sweep task. Idempotent; a no-op if no sweeper was started.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!(limiter = self.name, "Stopping rate limiter");
        }
        self.shutdown.cancel();
    }
}
