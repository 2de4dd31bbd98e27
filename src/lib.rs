//! # crawlfeed
//!
//! **crawlfeed** is the real-time side of a crawl-monitoring dashboard client.
//!
//! It keeps one persistent connection to the backend's event feed, reconnects
//! when it drops, routes every event to the handlers registered for its kind,
//! and collapses bursts of "this view is stale" signals into a single refresh
//! per view.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!            backend  /ws/crawl
//!                 │  JSON text frames
//!                 ▼
//! ┌───────────────────────────────────────────┐
//! │  EventChannel                             │──► ConnectionStatusReporter
//! │  - Transport (WsTransport)                │     (Connecting/Open/Closed/
//! │  - BackoffPolicy reconnect loop           │      Reconnecting, callbacks)
//! │  - frame → InboundEvent (malformed: skip) │
//! └───────────────────┬───────────────────────┘
//!                     │ push (never blocks)
//!                     ▼
//!         ┌───────────────────────┐
//!         │ DispatchQueue (bounded)│
//!         └───────────┬───────────┘
//!                     ▼
//!         ┌───────────────────────┐
//!         │ Dispatcher            │  kind → [handler, handler, ...]
//!         │ (isolated handlers)   │  unknown kind → ignored
//!         └───────────┬───────────┘
//!                     │ mark_dirty("status-cards")
//!                     ▼
//!         ┌───────────────────────┐
//!         │ RefreshCoordinator    │  debounce, drain, refresh once
//!         │                       │──► Notify (failed refresh → notice)
//!         └───────────────────────┘
//! ```
//!
//! ### Connection lifecycle
//! ```text
//! Connecting ──ok──► Open ──drop──► Closed ──backoff──► Reconnecting ──► Connecting
//!      └──────fail──────────────────►┘
//! close(): any state ──► Closed (final, no reconnection)
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types                                      |
//! |-------------------|------------------------------------------------------------------|------------------------------------------------|
//! | **Channel**       | Persistent connection with unbounded, jittered reconnection.    | [`EventChannel`], [`Transport`], [`Endpoint`]  |
//! | **Dispatch**      | Kind-based routing with per-handler error isolation.             | [`Dispatcher`], [`Handler`], [`HandlerFn`]     |
//! | **Refresh**       | Debounced, coalesced view refresh.                               | [`RefreshCoordinator`], [`RefreshFn`]          |
//! | **Status**        | Connection state broadcast.                                      | [`ConnectionStatusReporter`], [`ChannelState`] |
//! | **Notices**       | User-visible transient messages.                                 | [`Notify`], [`Notice`], [`LogNotifier`]        |
//! | **REST**          | Backend JSON routes (feature `rest`).                            | `ApiClient`, `ApiError`                        |
//!
//! ## Optional features
//! - `ws` (default): [`WsTransport`] over tokio-tungstenite.
//! - `rest` (default): `ApiClient` over reqwest.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use crawlfeed::{Config, HandlerError, HandlerFn, InboundEvent, LiveFeedBuilder, RefreshError, RefreshFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = LiveFeedBuilder::new(Config::default())
//!         .refresh_target("status-cards", RefreshFn::arc(|| async {
//!             // GET /api/dashboard and re-render
//!             Ok::<(), RefreshError>(())
//!         }))
//!         .refresh_on("crawl_complete", ["status-cards"])
//!         .refresh_on("notification", ["status-cards"])
//!         .on("crawl_progress", HandlerFn::arc("progress", |ev: InboundEvent| async move {
//!             println!("progress: {:?}", ev.progress());
//!             Ok::<(), HandlerError>(())
//!         }))
//!         .with_event_notices()
//!         .build()?;
//!
//!     feed.status().subscribe(|change| println!("connection {}", change.current));
//!     feed.start_at("http://localhost:8000/")?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     feed.close();
//!     feed.closed().await;
//!     Ok(())
//! }
//! ```

mod channel;
mod config;
mod dispatch;
mod error;
mod events;
mod feed;
mod notify;
mod policies;
mod refresh;
mod status;

#[cfg(feature = "rest")]
mod api;

// ---- Public re-exports ----

pub use channel::{Endpoint, EventChannel, FEED_PATH, Frame, FrameStream, Transport};
pub use config::Config;
pub use dispatch::{DispatchQueue, DispatchReport, Dispatcher, Handler, HandlerFn, HandlerRef};
pub use error::{ChannelError, HandlerError, RefreshError};
pub use events::{InboundEvent, KnownKind, TYPE_FIELD};
pub use feed::{LiveFeed, LiveFeedBuilder, RefreshHandle};
pub use notify::{EventNotices, LogNotifier, Notice, NoticeLevel, Notify, notice_for};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use refresh::{FlushReport, RefreshCoordinator, RefreshFn, RefreshRef, RefreshTarget};
pub use status::{ChannelState, ConnectionStatusReporter, StateChange, SubscriptionId};

#[cfg(feature = "ws")]
pub use channel::WsTransport;

#[cfg(feature = "rest")]
pub use api::{ApiClient, ApiError};
