//! # ConnectionStatusReporter – broadcast of channel state transitions.
//!
//! Holds the current [`ChannelState`] and fans every transition out to the
//! registered callbacks, in order. It contains no business logic.
//!
//! ## Rules
//! - Setting the current state again is not a transition and notifies nobody.
//! - Callbacks run synchronously, in subscription order, on the task that
//!   changed the state. Keep them short (update an indicator, log a line).
//! - A panicking callback is caught and logged; the remaining callbacks still run.
//! - Async observers use [`ConnectionStatusReporter::watch`] instead.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use crawlfeed::{ChannelState, ConnectionStatusReporter};
//!
//! let reporter = ConnectionStatusReporter::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! reporter.subscribe(move |change| {
//!     if change.current.is_open() {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!     }
//! });
//!
//! reporter.set(ChannelState::Connecting);
//! reporter.set(ChannelState::Open);
//! assert_eq!(reporter.current_state(), ChannelState::Open);
//! assert_eq!(seen.load(Ordering::Relaxed), 1);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tokio::sync::watch;

use crate::error::panic_message;
use crate::status::state::{ChannelState, StateChange};

type Callback = Arc<dyn Fn(StateChange) + Send + Sync>;

/// Handle returned by [`ConnectionStatusReporter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Current connection state plus transition broadcast.
pub struct ConnectionStatusReporter {
    state: watch::Sender<ChannelState>,
    callbacks: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
}

impl ConnectionStatusReporter {
    /// Creates a reporter in the [`ChannelState::Closed`] state.
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(ChannelState::Closed);
        Self {
            state,
            callbacks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns the current state.
    pub fn current_state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Registers a callback invoked on every transition.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(StateChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_callbacks().push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.lock_callbacks();
        let before = callbacks.len();
        callbacks.retain(|(sid, _)| *sid != id);
        callbacks.len() != before
    }

    /// Returns a receiver that observes the latest state.
    ///
    /// Intermediate states may be skipped by a slow receiver; use
    /// [`subscribe`](Self::subscribe) to see every transition.
    pub fn watch(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.lock_callbacks().len()
    }

    /// Records a new state and notifies subscribers if it changed.
    ///
    /// Returns the transition when one happened.
    pub fn set(&self, next: ChannelState) -> Option<StateChange> {
        let change = self.record(next)?;
        self.broadcast(change);
        Some(change)
    }

    /// Updates the current state without running callbacks.
    ///
    /// The caller must pass the returned change to [`broadcast`](Self::broadcast)
    /// once it holds no locks of its own, since callbacks may call back into
    /// the channel.
    pub(crate) fn record(&self, next: ChannelState) -> Option<StateChange> {
        let mut previous = next;
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            previous = std::mem::replace(current, next);
            true
        });
        if !changed {
            return None;
        }
        tracing::debug!(from = %previous, to = %next, "channel state changed");
        Some(StateChange {
            previous,
            current: next,
            at: SystemTime::now(),
        })
    }

    /// Runs every callback for `change`, in subscription order.
    pub(crate) fn broadcast(&self, change: StateChange) {
        let callbacks: Vec<(SubscriptionId, Callback)> = self.lock_callbacks().clone();
        for (id, cb) in callbacks {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cb(change))) {
                tracing::error!(
                    subscription = id.0,
                    panic = %panic_message(payload.as_ref()),
                    "status subscriber panicked"
                );
            }
        }
    }

    fn lock_callbacks(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Callback)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConnectionStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(reporter: &ConnectionStatusReporter) -> Arc<Mutex<Vec<ChannelState>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        reporter.subscribe(move |c| sink.lock().unwrap().push(c.current));
        log
    }

    #[test]
    fn starts_closed() {
        assert_eq!(
            ConnectionStatusReporter::new().current_state(),
            ChannelState::Closed
        );
    }

    #[test]
    fn broadcasts_every_transition_in_order() {
        let reporter = ConnectionStatusReporter::new();
        let a = recorder(&reporter);
        let b = recorder(&reporter);

        for s in [
            ChannelState::Connecting,
            ChannelState::Open,
            ChannelState::Closed,
            ChannelState::Reconnecting,
            ChannelState::Connecting,
        ] {
            reporter.set(s);
        }

        let expected = vec![
            ChannelState::Connecting,
            ChannelState::Open,
            ChannelState::Closed,
            ChannelState::Reconnecting,
            ChannelState::Connecting,
        ];
        assert_eq!(*a.lock().unwrap(), expected);
        assert_eq!(*b.lock().unwrap(), expected);
    }

    #[test]
    fn repeated_state_is_not_a_transition() {
        let reporter = ConnectionStatusReporter::new();
        let log = recorder(&reporter);
        assert!(reporter.set(ChannelState::Closed).is_none());
        let change = reporter.set(ChannelState::Connecting).unwrap();
        assert_eq!(change.previous, ChannelState::Closed);
        assert!(reporter.set(ChannelState::Connecting).is_none());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let reporter = ConnectionStatusReporter::new();
        reporter.subscribe(|_| panic!("indicator widget gone"));
        let log = recorder(&reporter);

        reporter.set(ChannelState::Connecting);
        reporter.set(ChannelState::Open);
        assert_eq!(
            *log.lock().unwrap(),
            vec![ChannelState::Connecting, ChannelState::Open]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let reporter = ConnectionStatusReporter::new();
        let log = Arc::new(Mutex::new(0));
        let sink = log.clone();
        let id = reporter.subscribe(move |_| *sink.lock().unwrap() += 1);

        reporter.set(ChannelState::Connecting);
        assert!(reporter.unsubscribe(id));
        assert!(!reporter.unsubscribe(id));
        reporter.set(ChannelState::Open);

        assert_eq!(*log.lock().unwrap(), 1);
        assert_eq!(reporter.subscriber_count(), 0);
    }

    #[test]
    fn record_updates_state_without_callbacks() {
        let reporter = ConnectionStatusReporter::new();
        let log = recorder(&reporter);

        let change = reporter.record(ChannelState::Connecting).unwrap();
        assert_eq!(reporter.current_state(), ChannelState::Connecting);
        assert!(log.lock().unwrap().is_empty());

        reporter.broadcast(change);
        assert_eq!(*log.lock().unwrap(), vec![ChannelState::Connecting]);
    }

    #[tokio::test]
    async fn watch_observes_latest_state() {
        let reporter = ConnectionStatusReporter::new();
        let mut rx = reporter.watch();
        reporter.set(ChannelState::Connecting);
        reporter.set(ChannelState::Open);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ChannelState::Open);
    }
}
