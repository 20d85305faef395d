//! Notification debouncing
//!
//! Screen updates arrive far faster than an accessibility client can use
//! them. The [`Debouncer`] lets each notification kind through at most once
//! per interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default minimum gap between two notifications of the same kind
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
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
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-kind rate limiter
pub struct Debouncer {
    interval: Duration,
    last_posted: HashMap<&'static str, Instant>,
    clock: Arc<dyn Clock>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, Arc::new(SystemClock))
    }

    pub fn with_clock(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval,
            last_posted: HashMap::new(),
            clock,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `kind` may fire now; records the firing when it may
    pub fn should_post(&mut self, kind: &'static str) -> bool {
        let now = self.clock.now();
        self.should_post_at(kind, now)
    }

    /// [`should_post`](Self::should_post) against an explicit instant
    pub fn should_post_at(&mut self, kind: &'static str, now: Instant) -> bool {
        let permitted = match self.last_posted.get(kind) {
            Some(&prev) => now.saturating_duration_since(prev) > self.interval,
            None => true,
        };
        if permitted {
            self.last_posted.insert(kind, now);
        }
        permitted
    }

    /// Forget every recorded firing
    pub fn reset(&mut self) {
        self.last_posted.clear();
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
