// Copyright 2025 Cowboy AI, LLC.

//! Domain clocks
//!
//! Every domain reads its own clock. Nothing in this crate assumes two domains
//! agree on the time.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Seconds on a domain's clock
pub type Timestamp = u64;

/// Source of the current time for one domain
pub trait Clock: Send + Sync + Debug {
    /// Current time in seconds
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `chrono::Utc::now()`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch clocks are clamped to zero
        u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Manually driven clock, shareable between a domain and the code steering it
///
/// # Examples
///
/// ```rust
/// use cim_promise::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// let handle = clock.clone();
/// handle.advance(100);
/// assert_eq!(clock.now(), 1_100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
