//! Sliding-window admission control.
//!
//! A limiter remembers the instants of the requests it accepted and admits a
//! new one only while fewer than `max_requests` of them fall inside the
//! trailing window. One limiter is shared by every pipeline run in the
//! process unless a caller builds its own.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_MAX_REQUESTS: usize = 10;
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

// Upper bound on the queue's up-front allocation; it grows past this on demand.
const INITIAL_QUEUE_CAPACITY: usize = 64;

/// Window size and request cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Source of "now" for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Limiter
// ---------------------------------------------------------------------------

pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Box<dyn Clock>,
    timestamps: Mutex<VecDeque<Instant>>,
}

static GLOBAL: Lazy<Arc<RateLimiter>> = Lazy::new(|| Arc::new(RateLimiter::default()));

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock<C: Clock + 'static>(config: RateLimitConfig, clock: C) -> Self {
        Self {
            config,
            clock: Box::new(clock),
            timestamps: Mutex::new(VecDeque::with_capacity(
                config.max_requests.min(INITIAL_QUEUE_CAPACITY),
            )),
        }
    }

    /// The process-wide limiter with the default 10 requests per minute.
    pub fn global() -> Arc<RateLimiter> {
        Arc::clone(&GLOBAL)
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        // The queue is always left consistent, so a poisoned lock is still usable.
        self.timestamps.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        let window = self.config.window();
        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Try to take one slot in the current window.
    ///
    /// Prune, count and record happen under a single lock.
    pub fn admit(&self) -> bool {
        let now = self.clock.now();
        let mut timestamps = self.lock();
        self.prune(&mut timestamps, now);

        if timestamps.len() >= self.config.max_requests {
            debug!(
                in_window = timestamps.len(),
                max = self.config.max_requests,
                "rate limiter rejected request"
            );
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Time until the oldest recorded request leaves the window.
    pub fn time_until_reset(&self) -> Duration {
        let now = self.clock.now();
        let timestamps = self.lock();
        match timestamps.front() {
            Some(&oldest) => self
                .config
                .window()
                .saturating_sub(now.saturating_duration_since(oldest)),
            None => Duration::ZERO,
        }
    }

    /// Requests still available in the current window.
    pub fn remaining(&self) -> usize {
        let now = self.clock.now();
        let mut timestamps = self.lock();
        self.prune(&mut timestamps, now);
        self.config.max_requests.saturating_sub(timestamps.len())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("in_window", &self.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window_ms: u64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(
            RateLimitConfig {
                max_requests,
                window_ms,
            },
            clock.clone(),
        );
        (limiter, clock)
    }

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let (limiter, clock) = limiter(10, 60_000);
        for i in 0..10 {
            assert!(limiter.admit(), "request {} should be admitted", i + 1);
            clock.advance(Duration::from_millis(100));
        }
        assert!(!limiter.admit());
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn window_expiry_readmits() {
        let (limiter, clock) = limiter(10, 60_000);
        for _ in 0..10 {
            assert!(limiter.admit());
        }
        assert!(!limiter.admit());
        clock.advance(Duration::from_millis(60_001));
        assert!(limiter.admit());
    }

    #[test]
    fn huge_cap_does_not_allocate_up_front() {
        let (limiter, _) = limiter(usize::MAX, 60_000);
        assert!(limiter.admit());
        assert_eq!(limiter.remaining(), usize::MAX - 1);
    }

    #[test]
    fn only_expired_entries_are_pruned() {
        let (limiter, clock) = limiter(2, 1_000);
        assert!(limiter.admit());
        clock.advance(Duration::from_millis(600));
        assert!(limiter.admit());
        clock.advance(Duration::from_millis(500));
        // First entry is 1100ms old, second only 500ms.
        assert!(limiter.admit());
        assert!(!limiter.admit());
    }

    #[test]
    fn rejection_leaves_state_unchanged() {
        let (limiter, clock) = limiter(1, 1_000);
        assert!(limiter.admit());
        clock.advance(Duration::from_millis(400));
        assert!(!limiter.admit());
        // A rejected call must not extend the window.
        clock.advance(Duration::from_millis(600));
        assert!(limiter.admit());
    }

    #[test]
    fn time_until_reset_tracks_oldest_entry() {
        let (limiter, clock) = limiter(3, 10_000);
        assert_eq!(limiter.time_until_reset(), Duration::ZERO);
        limiter.admit();
        clock.advance(Duration::from_millis(2_500));
        limiter.admit();
        assert_eq!(limiter.time_until_reset(), Duration::from_millis(7_500));
        clock.advance(Duration::from_millis(20_000));
        assert_eq!(limiter.time_until_reset(), Duration::ZERO);
    }

    #[test]
    fn shared_across_threads() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            max_requests: 25,
            window_ms: 60_000,
        }));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..10).filter(|_| limiter.admit()).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 25);
    }

    #[test]
    fn defaults() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window(), Duration::from_secs(60));
    }
}
