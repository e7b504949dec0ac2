//! Sliding-window request limiter.
//!
//! One window per key: the timestamps of admitted requests within the
//! trailing window. Windows are pruned lazily on access. The table is an
//! LRU cache of at most `max_keys` entries ordered by last admission; a new
//! key arriving at capacity evicts the least recently admitted key. Idle
//! keys are dropped by [`SlidingWindowLimiter::sweep`], which the service
//! runs periodically.

use crate::errors::GatewayError;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{
    record_rate_limit_decision, record_rate_limit_evictions, set_rate_limit_tracked_keys,
};
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key identifying one rate-limit window.
///
/// Authenticated callers live under `user:`, anonymous callers under `ip:`.
/// The prefixes keep the two namespaces disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn user(subject: &str) -> Self {
        Self(format!("user:{subject}"))
    }

    pub fn ip(addr: impl fmt::Display) -> Self {
        Self(format!("ip:{addr}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Successful admission through the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted {
    /// Requests still available in the current window after this one.
    pub remaining: u32,
}

type WindowTable = LruCache<RateLimitKey, VecDeque<DateTime<Utc>>>;

/// Bounded table of per-key sliding windows.
///
/// Every prune-check-append sequence runs under one lock, so concurrent
/// callers for the same key never both take the last slot.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    windows: Mutex<WindowTable>,
    window: Duration,
    max_keys: usize,
}

impl SlidingWindowLimiter {
    /// Create a limiter with the given window and key capacity.
    ///
    /// Sub-second windows are rounded up to one second; `max_keys` of zero
    /// is treated as one.
    pub fn new(window: std::time::Duration, max_keys: usize) -> Self {
        // Window is bounded by configuration to at most one day
        #[allow(clippy::cast_possible_wrap)]
        let seconds = window.as_secs().max(1) as i64;
        let capacity = NonZeroUsize::new(max_keys).unwrap_or(NonZeroUsize::MIN);
        Self {
            windows: Mutex::new(LruCache::new(capacity)),
            window: Duration::seconds(seconds),
            max_keys: capacity.get(),
        }
    }

    /// Window length in whole seconds, used as the retry-after hint.
    pub fn window_seconds(&self) -> u64 {
        self.window.num_seconds().unsigned_abs()
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Number of keys currently held.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Admit or reject one request for `key` at `now`.
    ///
    /// Prunes timestamps with `now - t >= window`. If `limit` or more remain
    /// the call is rejected and `now` is not recorded; otherwise `now` is
    /// appended and the key becomes the most recently admitted.
    ///
    /// # Errors
    ///
    /// `RateLimitExceeded` with `retry_after_seconds` equal to the window.
    pub fn check_and_record(
        &self,
        key: &RateLimitKey,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Admitted, GatewayError> {
        let outcome = self.check_and_record_locked(key, limit, now);
        match &outcome {
            Ok(_) => record_rate_limit_decision("allowed"),
            Err(_) => {
                record_rate_limit_decision("rejected");
                tracing::debug!(
                    target: "gateway.admission",
                    limit = limit,
                    "Rate limit exceeded"
                );
            }
        }
        outcome
    }

    fn check_and_record_locked(
        &self,
        key: &RateLimitKey,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Admitted, GatewayError> {
        let limit_len = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut windows = self.lock();

        // Rejections use `peek_mut` so they never refresh a key's recency
        if let Some(timestamps) = windows.peek_mut(key) {
            // `now` is read before the lock; concurrent callers may arrive
            // out of order, and each window must stay sorted.
            let now = timestamps.back().map_or(now, |newest| now.max(*newest));
            prune(timestamps, now, self.window);

            if timestamps.len() >= limit_len {
                if timestamps.is_empty() {
                    windows.pop(key);
                }
                return Err(self.exceeded());
            }

            timestamps.push_back(now);
            let remaining = remaining_after(limit_len, timestamps.len());
            windows.promote(key);
            return Ok(Admitted { remaining });
        }

        if limit_len == 0 {
            return Err(self.exceeded());
        }

        // The key is absent, so anything returned was evicted for room
        if let Some((evicted, _)) = windows.push(key.clone(), VecDeque::from([now])) {
            record_rate_limit_evictions("capacity", 1);
            tracing::debug!(
                target: "gateway.admission",
                evicted = %hash_for_correlation(evicted.as_str()),
                "Rate limit table at capacity, evicted least recently admitted key"
            );
        }
        set_rate_limit_tracked_keys(windows.len());

        Ok(Admitted {
            remaining: remaining_after(limit_len, 1),
        })
    }

    fn exceeded(&self) -> GatewayError {
        GatewayError::RateLimitExceeded {
            retry_after_seconds: self.window_seconds(),
        }
    }

    /// Drop every key whose newest timestamp has left the window.
    ///
    /// Returns the number of keys removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.lock();
        let idle: Vec<RateLimitKey> = windows
            .iter()
            .filter(|(_, timestamps)| is_idle(timestamps, now, self.window))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &idle {
            windows.pop(key);
        }
        let tracked = windows.len();
        drop(windows);

        record_rate_limit_evictions("idle", idle.len() as u64);
        set_rate_limit_tracked_keys(tracked);
        idle.len()
    }

    fn lock(&self) -> MutexGuard<'_, WindowTable> {
        // Each window is self-contained; a panicked holder cannot leave a
        // cross-key invariant broken.
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(timestamps: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now - *oldest >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

fn is_idle(timestamps: &VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
    !timestamps
        .back()
        .is_some_and(|newest| now - *newest < window)
}

fn remaining_after(limit: usize, used: usize) -> u32 {
    u32::try_from(limit.saturating_sub(used)).unwrap_or(u32::MAX)
}
