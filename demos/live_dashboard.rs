//! # Example: live_dashboard
//!
//! Connects to a running monitoring backend and keeps two "views" fresh:
//! the status cards (`GET /api/dashboard`) and the job timeline
//! (`GET /api/job-history`). Crawl lifecycle events and notifications are
//! shown as log-line toasts.
//!
//! ## Flow
//! ```text
//! /ws/crawl ──► crawl_complete ──► mark_dirty(status-cards, timeline)
//!           ──► notification   ──► mark_dirty(status-cards) + toast
//!           ──► crawl_progress ──► progress line
//!                         200ms later ──► GET /api/dashboard, GET /api/job-history
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=crawlfeed=debug,live_dashboard=info cargo run --example live_dashboard -- http://localhost:8000/
//! ```

use crawlfeed::{
    ApiClient, Config, Endpoint, HandlerError, HandlerFn, InboundEvent, LiveFeedBuilder,
    RefreshError, RefreshFn, RefreshRef,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let origin = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000/".to_string());
    let endpoint = Endpoint::from_origin(&origin)?;
    let api = ApiClient::for_endpoint(&endpoint);

    let status_cards: RefreshRef = {
        let api = api.clone();
        RefreshFn::arc(move || {
            let api = api.clone();
            async move {
                let dashboard = api.dashboard().await?;
                let sites = dashboard["sites"].as_array().map(Vec::len).unwrap_or(0);
                tracing::info!(sites, last_refresh = %dashboard["last_refresh"], "status cards refreshed");
                Ok::<(), RefreshError>(())
            }
        })
    };

    let timeline: RefreshRef = {
        let api = api.clone();
        RefreshFn::arc(move || {
            let api = api.clone();
            async move {
                let history = api.job_history().await?;
                let jobs = history.as_array().map(Vec::len).unwrap_or(0);
                tracing::info!(jobs, "timeline refreshed");
                Ok::<(), RefreshError>(())
            }
        })
    };

    let progress = HandlerFn::arc("progress", |ev: InboundEvent| async move {
        match ev.progress() {
            Some(pct) => tracing::info!(site = ?ev.choice(), "crawl at {pct:.0}%"),
            None => tracing::debug!("progress event without percentage"),
        }
        Ok::<(), HandlerError>(())
    });

    let feed = LiveFeedBuilder::new(Config::default())
        .refresh_target("status-cards", status_cards)
        .refresh_target("timeline", timeline)
        .refresh_on("crawl_complete", ["status-cards", "timeline"])
        .refresh_on("crawl_error", ["timeline"])
        .refresh_on("notification", ["status-cards"])
        .on("crawl_progress", progress)
        .with_event_notices()
        .build()?;

    feed.status().subscribe(|change| {
        tracing::info!(from = %change.previous, to = %change.current, "connection");
    });

    // Initial render, then live updates.
    let handle = feed.refresh_handle();
    handle.mark_all(["status-cards", "timeline"]);
    feed.start(&endpoint)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!(
        received = feed.events_received(),
        dispatched = feed.events_dispatched(),
        dropped = feed.events_dropped(),
        "shutting down"
    );
    feed.close();
    feed.closed().await;

    Ok(())
}
