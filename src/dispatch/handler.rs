//! # Event handler trait and function-backed handler.
//!
//! [`Handler`] is the extension point for reacting to inbound events. The common
//! handle type is [`HandlerRef`], an `Arc<dyn Handler>` registered with the
//! [`Dispatcher`](crate::Dispatcher).
//!
//! ## Rules
//! - Handlers run on the dispatch worker, never on the read loop.
//! - Handlers for one event run sequentially, in registration order.
//! - Keep handlers short: mark refresh targets dirty, update in-memory state.
//!   Long work (network fetches) belongs in refresh targets.
//! - Errors and panics are caught by the dispatcher and logged.
//!
//! ## Example
//! ```rust
//! use crawlfeed::{HandlerFn, HandlerRef, HandlerError, InboundEvent};
//!
//! let h: HandlerRef = HandlerFn::arc("log-errors", |ev: InboundEvent| async move {
//!     if let Some(err) = ev.error() {
//!         eprintln!("crawl failed: {err}");
//!     }
//!     Ok::<_, HandlerError>(())
//! });
//! assert_eq!(h.name(), "log-errors");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::InboundEvent;

/// Shared handler handle.
pub type HandlerRef = Arc<dyn Handler>;

/// Reacts to one dispatched event.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handles a single event.
    async fn handle(&self, event: &InboundEvent) -> Result<(), HandlerError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed handler.
///
/// The closure receives an owned clone of the event and returns a fresh future
/// per call.
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(InboundEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &InboundEvent) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
