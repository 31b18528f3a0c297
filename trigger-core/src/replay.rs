//! Freshness check for received beacons.
//!
//! The sender tracks a 64-bit counter but only the low 32 bits travel on
//! the wire, so the receiver compares counters with serial-number
//! arithmetic: a counter is fresh if it lies in `(last_seen, last_seen + window]`
//! modulo 2^32. Lost beacons just widen the gap; duplicated or reordered
//! ones fall behind `last_seen` and are rejected.

use thiserror::Error;

/// Largest forward window: half the 32-bit counter space minus one.
pub const DEFAULT_WINDOW: u32 = (1 << 31) - 1;

/// Freshness errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The counter equals or precedes the last accepted one.
    #[error("replay detected: counter {counter} not after {last_seen}")]
    Stale {
        /// Received wire counter.
        counter: u32,
        /// Last accepted wire counter.
        last_seen: u32,
    },

    /// The counter jumped further ahead than the window allows.
    #[error("counter {counter} is more than {window} ahead of {last_seen}")]
    OutOfWindow {
        /// Received wire counter.
        counter: u32,
        /// Last accepted wire counter.
        last_seen: u32,
        /// Configured window.
        window: u32,
    },
}

/// Last-seen tracker for one paired sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGuard {
    last_seen: u32,
    window: u32,
}

impl ReplayGuard {
    /// A guard for a freshly paired sender (nothing seen yet).
    pub fn new() -> Self {
        Self::resume(0)
    }

    /// Resume from a persisted last-seen value.
    pub fn resume(last_seen: u32) -> Self {
        Self {
            last_seen,
            window: DEFAULT_WINDOW,
        }
    }

    /// Narrow the forward window. Clamped to `1..=DEFAULT_WINDOW`.
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window.clamp(1, DEFAULT_WINDOW);
        self
    }

    /// Last accepted wire counter.
    pub fn last_seen(&self) -> u32 {
        self.last_seen
    }

    /// Check a counter without recording it.
    pub fn check(&self, counter: u32) -> Result<(), ReplayError> {
        let ahead = counter.wrapping_sub(self.last_seen);
        if ahead == 0 || ahead > DEFAULT_WINDOW {
            return Err(ReplayError::Stale {
                counter,
                last_seen: self.last_seen,
            });
        }
        if ahead > self.window {
            return Err(ReplayError::OutOfWindow {
                counter,
                last_seen: self.last_seen,
                window: self.window,
            });
        }
        Ok(())
    }

    /// Check a counter and record it as the new last-seen value.
    pub fn accept(&mut self, counter: u32) -> Result<(), ReplayError> {
        self.check(counter)?;
        self.last_seen = counter;
        Ok(())
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}
