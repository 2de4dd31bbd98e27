//! # Feed configuration.
//!
//! [`Config`] centralizes the timing and capacity knobs of a [`LiveFeed`](crate::LiveFeed).
//! It is passed once to [`LiveFeedBuilder::new`](crate::LiveFeedBuilder::new); there is no
//! global configuration.
//!
//! ## Sentinel values
//! - `max_debounce = 0s` → no cap (a steady event stream can postpone refreshes indefinitely)
//! - `connect_timeout = 0s` → wait for the transport handshake without limit
//! - `debounce = 0s` → refresh on the next timer tick after each mark

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Runtime configuration for the feed.
///
/// ## Field semantics
/// - `reconnect`: delay schedule after a dropped or failed connection
/// - `connect_timeout`: limit for one handshake attempt (`0s` = none)
/// - `debounce`: trailing window during which marks for refresh targets coalesce
/// - `max_debounce`: upper bound between the first mark and the refresh (`0s` = none)
/// - `dispatch_capacity`: bounded queue between the read loop and the dispatcher (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Reconnection backoff. Attempts are unbounded.
    pub reconnect: BackoffPolicy,

    /// Handshake timeout for a single connection attempt.
    ///
    /// An attempt that times out counts as a transport failure and is retried
    /// per [`Config::reconnect`].
    pub connect_timeout: Duration,

    /// Debounce window for refresh coalescing.
    ///
    /// Every mark pushes the pending refresh to `now + debounce`.
    pub debounce: Duration,

    /// Maximum time a pending refresh can be postponed by new marks.
    pub max_debounce: Duration,

    /// Capacity of the dispatch queue.
    ///
    /// When the dispatcher falls behind by this many events, new events are
    /// dropped with a warning instead of stalling the read loop.
    pub dispatch_capacity: usize,
}

impl Config {
    /// Returns the handshake timeout as an `Option`.
    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        (!self.connect_timeout.is_zero()).then_some(self.connect_timeout)
    }

    /// Returns the debounce cap as an `Option`.
    #[inline]
    pub fn max_debounce(&self) -> Option<Duration> {
        (!self.max_debounce.is_zero()).then_some(self.max_debounce)
    }

    /// Returns the dispatch queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn dispatch_capacity_clamped(&self) -> usize {
        self.dispatch_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `reconnect = BackoffPolicy::default()` (1s doubling to 30s, equal jitter)
    /// - `connect_timeout = 10s`
    /// - `debounce = 200ms`
    /// - `max_debounce = 2s`
    /// - `dispatch_capacity = 256`
    fn default() -> Self {
        Self {
            reconnect: BackoffPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            debounce: Duration::from_millis(200),
            max_debounce: Duration::from_secs(2),
            dispatch_capacity: 256,
        }
    }
}
