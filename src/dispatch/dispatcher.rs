//! # Dispatcher: event kind → ordered handlers.
//!
//! Handlers are registered through `&mut self` while the feed is being wired;
//! once the dispatcher is shared behind an `Arc` the registration table is
//! frozen, so it can never change while an event is being dispatched.
//!
//! ## Rules
//! - Resolution is an exact string match on [`InboundEvent::kind`].
//! - Unknown kinds are ignored silently (the backend may add kinds at any time).
//! - Handlers for one kind run in registration order.
//! - Each invocation is isolated: an `Err` or a panic is logged and counted,
//!   the next handler still runs.
//!
//! ```text
//! dispatch(ev):
//!   handlers[ev.kind] ─► h1.handle(ev) ─► Ok
//!                     ─► h2.handle(ev) ─► Err / panic ─► warn!, failed += 1
//!                     ─► h3.handle(ev) ─► Ok
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::dispatch::handler::HandlerRef;
use crate::error::{HandlerError, panic_message};
use crate::events::InboundEvent;

/// Result of dispatching one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// True when no handler was registered for the event kind.
    #[inline]
    pub fn is_unhandled(&self) -> bool {
        self.invoked == 0
    }
}

/// Registration table and dispatch entry point.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Vec<HandlerRef>>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the handlers of `kind`.
    pub fn register(&mut self, kind: impl Into<String>, handler: HandlerRef) -> &mut Self {
        self.handlers.entry(kind.into()).or_default().push(handler);
        self
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Runs every handler registered for `event.kind()`.
    pub async fn dispatch(&self, event: &InboundEvent) -> DispatchReport {
        let Some(handlers) = self.handlers.get(event.kind()) else {
            tracing::trace!(kind = event.kind(), seq = event.seq(), "no handler for event kind");
            return DispatchReport::default();
        };

        let mut report = DispatchReport::default();
        for handler in handlers {
            report.invoked += 1;
            let outcome = AssertUnwindSafe(handler.handle(event))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(HandlerError::Panicked {
                        info: panic_message(payload.as_ref()).into_owned(),
                    })
                });

            if let Err(e) = outcome {
                report.failed += 1;
                tracing::warn!(
                    handler = handler.name(),
                    kind = event.kind(),
                    seq = event.seq(),
                    label = e.as_label(),
                    "{}",
                    e.as_message()
                );
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::HandlerFn;
    use std::sync::{Arc, Mutex};

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> HandlerRef {
        let log = log.clone();
        HandlerFn::arc(name, move |ev: InboundEvent| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(format!("{name}:{}", ev.kind()));
                Ok::<(), HandlerError>(())
            }
        })
    }

    fn explode() -> Result<(), HandlerError> {
        panic!("handler bug")
    }

    #[tokio::test]
    async fn runs_handlers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register("crawl_complete", recording("a", &log))
            .register("crawl_complete", recording("b", &log))
            .register("notification", recording("c", &log));

        let report = d.dispatch(&InboundEvent::new("crawl_complete")).await;
        assert_eq!(report, DispatchReport { invoked: 2, failed: 0 });
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:crawl_complete", "b:crawl_complete"]
        );
    }

    #[tokio::test]
    async fn unknown_kind_is_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register("notification", recording("a", &log));

        let report = d.dispatch(&InboundEvent::new("unknown_future_type")).await;
        assert!(report.is_unhandled());
        assert_eq!(report.failed, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_the_next_one() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register(
            "crawl_error",
            HandlerFn::arc("broken", |_ev: InboundEvent| async {
                Err::<(), _>(HandlerError::failed("toast container missing"))
            }),
        )
        .register("crawl_error", recording("after", &log));

        let report = d.dispatch(&InboundEvent::new("crawl_error")).await;
        assert_eq!(report, DispatchReport { invoked: 2, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["after:crawl_error"]);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_the_next_one() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register(
            "notification",
            HandlerFn::arc("panics", |_ev: InboundEvent| async { explode() }),
        )
        .register("notification", recording("after", &log));

        let report = d.dispatch(&InboundEvent::new("notification")).await;
        assert_eq!(report, DispatchReport { invoked: 2, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["after:notification"]);

        // The dispatcher stays usable.
        let report = d.dispatch(&InboundEvent::new("notification")).await;
        assert_eq!(report.invoked, 2);
    }

    #[test]
    fn introspection() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register("notification", recording("a", &log))
            .register("crawl_start", recording("b", &log))
            .register("notification", recording("c", &log));
        assert_eq!(d.kinds(), vec!["crawl_start", "notification"]);
        assert_eq!(d.handler_count("notification"), 2);
        assert_eq!(d.handler_count("crawl_error"), 0);
    }
}
