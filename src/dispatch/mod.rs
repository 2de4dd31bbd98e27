//! # Event dispatch.
//!
//! Routes parsed [`InboundEvent`](crate::InboundEvent)s to the handlers
//! registered for their kind.
//!
//! ## Architecture
//! ```text
//! EventChannel ── push ──► DispatchQueue ──► worker ──► Dispatcher::dispatch(&ev)
//!                                                             │
//!                                          handlers["notification"]   = [h1, h2]
//!                                          handlers["crawl_complete"] = [h3]
//!                                          anything else              → ignored
//! ```
//!
//! ## Implementing handlers
//! ```no_run
//! use async_trait::async_trait;
//! use crawlfeed::{Handler, HandlerError, InboundEvent};
//!
//! struct ProgressBar;
//!
//! #[async_trait]
//! impl Handler for ProgressBar {
//!     async fn handle(&self, ev: &InboundEvent) -> Result<(), HandlerError> {
//!         let pct = ev.progress().ok_or_else(|| HandlerError::failed("no progress"))?;
//!         println!("crawl at {pct:.0}%");
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str { "progress-bar" }
//! }
//! ```

mod dispatcher;
mod handler;
mod queue;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use handler::{Handler, HandlerFn, HandlerRef};
pub use queue::DispatchQueue;
