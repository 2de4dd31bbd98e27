//! # DispatchQueue: hand-off between the read loop and the dispatcher
//!
//! The read loop must never wait for handlers. [`DispatchQueue`] puts a bounded
//! queue and one worker task between them:
//!
//! ```text
//!  read loop ── push(ev) ──► [bounded queue] ──► worker ──► Dispatcher::dispatch(&ev)
//!     (never awaits)              │                  └─► token cancelled → stop
//!                                 └─► full → event dropped, warn!
//! ```
//!
//! ## What it guarantees
//! - `push` returns immediately.
//! - Events are dispatched in arrival order (FIFO), one at a time.
//! - After the cancellation token fires, no further event is dispatched, even if
//!   some are still queued. A dispatch in progress is dropped at its next await.
//!
//! ## What it does **not** guarantee
//! - No retry on overflow: the event is dropped and counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::dispatcher::Dispatcher;
use crate::events::InboundEvent;

/// Bounded queue with a dedicated dispatch worker.
pub struct DispatchQueue {
    sender: mpsc::Sender<InboundEvent>,
    dropped: Arc<AtomicU64>,
    dispatched: Arc<AtomicU64>,
    worker: JoinHandle<()>,
}

impl DispatchQueue {
    /// Creates the queue and spawns its worker.
    ///
    /// The worker stops when `token` is cancelled or the queue is dropped.
    pub fn spawn(dispatcher: Arc<Dispatcher>, capacity: usize, token: CancellationToken) -> Self {
        let (sender, mut rx) = mpsc::channel::<InboundEvent>(capacity.max(1));
        let dispatched = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&dispatched);

        let worker = tokio::spawn(async move {
            loop {
                let ev = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Some(ev) => ev,
                        None => break,
                    },
                };
                let report = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    report = dispatcher.dispatch(&ev) => report,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    kind = ev.kind(),
                    seq = ev.seq(),
                    invoked = report.invoked,
                    failed = report.failed,
                    "event dispatched"
                );
            }
            tracing::debug!("dispatch worker stopped");
        });

        Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
            dispatched,
            worker,
        }
    }

    /// Enqueues one event without waiting.
    ///
    /// Returns `false` if the event was dropped (queue full or worker gone).
    pub fn push(&self, event: InboundEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(ev)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(kind = ev.kind(), seq = ev.seq(), "dispatch queue full; event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(ev)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(kind = ev.kind(), seq = ev.seq(), "dispatch worker gone; event dropped");
                false
            }
        }
    }

    /// Events dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Events dispatched so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Closes the queue and waits for the worker to exit.
    ///
    /// Events still queued are dispatched first unless the token was cancelled.
    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.worker.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::HandlerFn;
    use crate::error::HandlerError;
    use std::sync::Mutex;
    use std::time::Duration;

    fn dispatcher_with_log(kind: &str, log: &Arc<Mutex<Vec<u64>>>) -> Arc<Dispatcher> {
        let log = log.clone();
        let mut d = Dispatcher::new();
        d.register(
            kind,
            HandlerFn::arc("record", move |ev: InboundEvent| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(ev.seq());
                    Ok::<(), HandlerError>(())
                }
            }),
        );
        Arc::new(d)
    }

    #[tokio::test]
    async fn dispatches_in_fifo_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let q = DispatchQueue::spawn(dispatcher_with_log("notification", &log), 16, CancellationToken::new());

        let seqs: Vec<u64> = (0..5)
            .map(|_| {
                let ev = InboundEvent::new("notification");
                let seq = ev.seq();
                assert!(q.push(ev));
                seq
            })
            .collect();

        q.shutdown().await;
        assert_eq!(*log.lock().unwrap(), seqs);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_does_not_block_push_and_overflow_drops() {
        let mut d = Dispatcher::new();
        d.register(
            "crawl_progress",
            HandlerFn::arc("slow", |_ev: InboundEvent| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<(), HandlerError>(())
            }),
        );
        let q = DispatchQueue::spawn(Arc::new(d), 2, CancellationToken::new());

        // First event is taken by the worker, two more fill the queue.
        assert!(q.push(InboundEvent::new("crawl_progress")));
        tokio::task::yield_now().await;
        assert!(q.push(InboundEvent::new("crawl_progress")));
        assert!(q.push(InboundEvent::new("crawl_progress")));
        assert!(!q.push(InboundEvent::new("crawl_progress")));
        assert_eq!(q.dropped(), 1);
    }

    #[tokio::test]
    async fn cancelled_queue_dispatches_nothing_more() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let token = CancellationToken::new();
        let q = DispatchQueue::spawn(dispatcher_with_log("notification", &log), 16, token.clone());

        token.cancel();
        q.push(InboundEvent::new("notification"));
        q.push(InboundEvent::new("notification"));
        q.shutdown().await;

        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_hung_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(AtomicU64::new(0));
        let mut d = Dispatcher::new();
        {
            let log = log.clone();
            let finished = finished.clone();
            d.register(
                "notification",
                HandlerFn::arc("hung", move |ev: InboundEvent| {
                    let log = log.clone();
                    let finished = finished.clone();
                    async move {
                        log.lock().unwrap().push(ev.seq());
                        tokio::time::sleep(Duration::from_secs(3_600)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), HandlerError>(())
                    }
                }),
            );
        }
        let token = CancellationToken::new();
        let q = DispatchQueue::spawn(Arc::new(d), 16, token.clone());

        q.push(InboundEvent::new("notification"));
        q.push(InboundEvent::new("notification"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(log.lock().unwrap().len(), 1);

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), q.shutdown())
            .await
            .expect("worker stops without waiting for the handler");

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
