//! # RefreshCoordinator: debounced, coalesced view refresh.
//!
//! Handlers call [`RefreshCoordinator::mark_dirty`] for every view an event
//! makes stale. Marks accumulate in a pending set; the set is drained when the
//! debounce deadline passes and each drained target is refreshed once.
//!
//! ## Deadline
//! ```text
//! mark(t) at time m:  deadline = m + debounce                 (trailing edge)
//!                     deadline = min(deadline, first + max)   (when max_debounce is set)
//!
//! t=0    mark("status-cards")     deadline = 200ms
//! t=50   mark("status-cards")     deadline = 250ms
//! t=250  fire → drain {status-cards} → refresh once
//! ```
//!
//! ## Rules
//! - A target is refreshed at most once per drain, however many marks it got.
//! - A target whose previous refresh is still running stays pending and is
//!   picked up when that refresh finishes (never two refreshes of one target at once).
//! - Refreshes of different targets run concurrently; a failing or panicking
//!   one is reported through [`Notify`] and does not affect the others.
//! - Failures are not retried; the next mark triggers the next attempt.
//! - Unknown target identifiers are ignored with a warning.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{RefreshError, panic_message};
use crate::notify::{Notice, Notify};
use crate::refresh::target::RefreshRef;

/// Targets refreshed by one [`RefreshCoordinator::flush`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Targets whose refresh succeeded.
    pub refreshed: Vec<String>,
    /// Targets whose refresh failed or panicked.
    pub failed: Vec<String>,
}

enum Command {
    Dirty(String),
    Flush(oneshot::Sender<FlushReport>),
}

#[derive(Default)]
struct Counters {
    runs: AtomicU64,
    failures: AtomicU64,
}

/// Handle to the debounced refresh worker.
///
/// Cheap to clone; every clone talks to the same worker.
#[derive(Clone)]
pub struct RefreshCoordinator {
    tx: mpsc::UnboundedSender<Command>,
    known: Arc<BTreeSet<String>>,
    counters: Arc<Counters>,
}

impl RefreshCoordinator {
    /// Spawns the refresh worker.
    ///
    /// - `debounce`: trailing window per burst of marks
    /// - `max_debounce`: cap between the first mark and the refresh (`None` = no cap)
    /// - `token`: stops the worker; pending marks are discarded
    pub fn spawn(
        targets: BTreeMap<String, RefreshRef>,
        debounce: Duration,
        max_debounce: Option<Duration>,
        notifier: Arc<dyn Notify>,
        token: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let known = Arc::new(targets.keys().cloned().collect::<BTreeSet<_>>());
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            targets,
            debounce,
            max_debounce,
            notifier,
            counters: Arc::clone(&counters),
            pending: BTreeSet::new(),
            in_flight: HashSet::new(),
            first_mark: None,
            deadline: None,
        };
        tokio::spawn(worker.run(rx, token));

        Self { tx, known, counters }
    }

    /// Marks a target stale. Returns `false` when the id is unknown or the
    /// coordinator has stopped.
    pub fn mark_dirty(&self, target: &str) -> bool {
        if !self.known.contains(target) {
            tracing::warn!(target, "mark_dirty for unknown refresh target");
            return false;
        }
        self.tx.send(Command::Dirty(target.to_string())).is_ok()
    }

    /// Refreshes every pending target now and waits for the results.
    ///
    /// Targets whose refresh is already running stay pending.
    pub async fn flush(&self) -> FlushReport {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).is_err() {
            return FlushReport::default();
        }
        rx.await.unwrap_or_default()
    }

    /// Registered target identifiers.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }

    /// Refresh operations started so far.
    pub fn runs(&self) -> u64 {
        self.counters.runs.load(Ordering::Relaxed)
    }

    /// Refresh operations that failed so far.
    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }

    /// True once the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

struct Worker {
    targets: BTreeMap<String, RefreshRef>,
    debounce: Duration,
    max_debounce: Option<Duration>,
    notifier: Arc<dyn Notify>,
    counters: Arc<Counters>,

    pending: BTreeSet<String>,
    in_flight: HashSet<String>,
    first_mark: Option<Instant>,
    deadline: Option<Instant>,
}

type Outcome = (String, Result<(), RefreshError>);
type FlushBatch = (oneshot::Sender<FlushReport>, Vec<Outcome>);

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>, token: CancellationToken) {
        let mut running: JoinSet<Outcome> = JoinSet::new();
        let mut flushing: JoinSet<FlushBatch> = JoinSet::new();

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(Command::Dirty(target)) => self.mark(target),
                    Some(Command::Flush(reply)) => {
                        let batch = self.drain_due();
                        flushing.spawn(async move {
                            let outcomes = futures::future::join_all(
                                batch.into_iter().map(|(target, op)| run_one(target, op)),
                            )
                            .await;
                            (reply, outcomes)
                        });
                    }
                    None => break,
                },
                Some(joined) = running.join_next(), if !running.is_empty() => {
                    if let Ok((target, res)) = joined {
                        self.complete(&target, &res);
                    }
                }
                Some(joined) = flushing.join_next(), if !flushing.is_empty() => {
                    if let Ok((reply, outcomes)) = joined {
                        let mut report = FlushReport::default();
                        for (target, res) in outcomes {
                            self.complete(&target, &res);
                            match res {
                                Ok(()) => report.refreshed.push(target),
                                Err(_) => report.failed.push(target),
                            }
                        }
                        let _ = reply.send(report);
                    }
                }
                _ = sleep_until(deadline), if deadline.is_some() => {
                    for (target, op) in self.drain_due() {
                        running.spawn(run_one(target, op));
                    }
                }
            }
        }

        running.abort_all();
        flushing.abort_all();
        if !self.pending.is_empty() {
            tracing::debug!(pending = self.pending.len(), "refresh worker stopped with pending targets");
        }
    }

    /// Bookkeeping for one finished refresh; re-arms the timer if the target
    /// was marked again while it ran.
    fn complete(&mut self, target: &str, res: &Result<(), RefreshError>) {
        self.in_flight.remove(target);
        self.report(target, res);
        if self.pending.contains(target) && self.deadline.is_none() {
            self.arm(Instant::now());
        }
    }

    fn mark(&mut self, target: String) {
        let now = Instant::now();
        self.pending.insert(target);
        self.arm(now);
    }

    fn arm(&mut self, now: Instant) {
        let first = *self.first_mark.get_or_insert(now);
        let mut deadline = now + self.debounce;
        if let Some(max) = self.max_debounce {
            deadline = deadline.min(first + max);
        }
        self.deadline = Some(deadline);
    }

    /// Takes every pending target that is not already refreshing.
    fn drain_due(&mut self) -> Vec<(String, RefreshRef)> {
        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|t| !self.in_flight.contains(*t))
            .cloned()
            .collect();

        let mut batch = Vec::with_capacity(ready.len());
        for target in ready {
            self.pending.remove(&target);
            if let Some(op) = self.targets.get(&target) {
                self.in_flight.insert(target.clone());
                self.counters.runs.fetch_add(1, Ordering::Relaxed);
                batch.push((target, Arc::clone(op)));
            }
        }

        self.first_mark = None;
        self.deadline = None;
        tracing::debug!(
            batch = batch.len(),
            deferred = self.pending.len(),
            "refresh window closed"
        );
        batch
    }

    fn report(&self, target: &str, res: &Result<(), RefreshError>) {
        let Err(e) = res else {
            tracing::trace!(target, "refreshed");
            return;
        };
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(target, label = e.as_label(), "{}", e.as_message());

        let notice = Notice::error("Refresh failed", e.to_string());
        if let Err(payload) =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.notifier.notify(&notice)))
        {
            tracing::error!(
                notifier = self.notifier.name(),
                panic = %panic_message(payload.as_ref()),
                "notifier panicked"
            );
        }
    }
}

async fn run_one(target: String, op: RefreshRef) -> Outcome {
    let res = AssertUnwindSafe(op.refresh())
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(RefreshError::Panicked {
                target: target.clone(),
                info: panic_message(payload.as_ref()).into_owned(),
            })
        });
    (target, res)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
