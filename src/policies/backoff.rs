//! # Reconnect backoff.
//!
//! [`BackoffPolicy`] decides how long the event channel waits after a dropped
//! or failed connection before the next attempt. The delay for the `n`-th
//! consecutive failure (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jittered.
//!
//! The base delay depends only on the failure count, so jitter output never
//! feeds back into later delays. The channel resets the count after every
//! successful open, so a long-lived dashboard that blips once reconnects after
//! `first`, not after the cap.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use crawlfeed::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(30),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
//! assert_eq!(backoff.delay_for(3), Duration::from_secs(8));
//! assert_eq!(backoff.delay_for(10), Duration::from_secs(30));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay schedule between reconnection attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnection attempt.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth per consecutive failure (`1.0` = fixed delay).
    pub factor: f64,
    /// Randomization applied on top of the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 1s`, `factor = 2.0`, `max = 30s`, `jitter = Equal`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Fixed delay with no growth and no jitter.
    ///
    /// Matches the legacy "retry every N seconds" behaviour of browser pages.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns the delay to wait after `failures` consecutive failures (0-indexed).
    ///
    /// - `factor < 1.0` shrinks delays (unusual, still clamped to `max`);
    /// - negative, non-finite or overflowing products collapse to `max`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.jittered(self.base_for(failures))
    }

    fn base_for(&self, failures: u32) -> Duration {
        let growth = self.factor.powi(failures.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.first.as_secs_f64() * growth)
            .map_or(self.max, |d| d.min(self.max))
    }

    fn jittered(&self, base: Duration) -> Duration {
        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            other => other.apply(base),
        }
    }
}

/// Consecutive-failure counter driving one channel's reconnect delays.
#[derive(Debug)]
pub(crate) struct ReconnectSchedule {
    policy: BackoffPolicy,
    failures: u32,
}

impl ReconnectSchedule {
    pub(crate) fn new(policy: BackoffPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    /// Delay before the next attempt; counts one more failure.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.policy.delay_for(self.failures);
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Called after a successful open.
    pub(crate) fn reset(&mut self) {
        self.failures = 0;
    }

    pub(crate) fn failures(&self) -> u32 {
        self.failures
    }
}
