//! # Debounced view refresh.
//!
//! Several events in a burst often make the same view stale (a notification
//! immediately followed by `crawl_complete` both invalidate the status cards).
//! Re-fetching per event wastes requests; the coordinator collapses them.
//!
//! ```text
//! handler ── mark_dirty("status-cards") ──► pending {status-cards}
//! handler ── mark_dirty("status-cards") ──► pending {status-cards}   (deadline pushed)
//!                              deadline ──► drain ──► status-cards.refresh()  ×1
//! ```
//!
//! - [`RefreshTarget`] / [`RefreshFn`]: the caller-supplied re-fetch operation
//! - [`RefreshCoordinator`]: pending set, debounce timer, isolated execution

mod coordinator;
mod target;

pub use coordinator::{FlushReport, RefreshCoordinator};
pub use target::{RefreshFn, RefreshRef, RefreshTarget};
