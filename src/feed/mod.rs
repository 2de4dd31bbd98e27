//! # LiveFeed: the wired subsystem.
//!
//! ```text
//! LiveFeedBuilder::new(cfg)
//!     .on("crawl_progress", progress_bar)
//!     .refresh_target("status-cards", status_cards)
//!     .refresh_on("crawl_complete", ["status-cards", "timeline"])
//!     .build()?                       ─► LiveFeed
//!
//! LiveFeed::start(endpoint):
//!   EventChannel ── sink ──► DispatchQueue ──► Dispatcher ──► handlers
//!        │                                                      │ mark_dirty
//!        └─► ConnectionStatusReporter          RefreshCoordinator ◄─┘
//! ```
//!
//! Everything hangs off one cancellation token owned by the feed;
//! [`LiveFeed::close`] (or dropping the feed) stops all three tasks.

mod builder;
mod handle;
mod live;

pub use builder::LiveFeedBuilder;
pub use handle::RefreshHandle;
pub use live::LiveFeed;
