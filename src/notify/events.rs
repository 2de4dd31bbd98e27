//! # Feed events as notices.
//!
//! [`EventNotices`] is a [`Handler`] that turns user-relevant events into
//! toasts:
//!
//! ```text
//! notification   → level from urgency_level, title/message from the event
//! crawl_start    → Info    "Crawl started"
//! crawl_complete → Success "Crawl complete"
//! crawl_error    → Error   "Crawl failed: <error>"
//! crawl_progress, crawl_status, anything else → nothing
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::Handler;
use crate::error::HandlerError;
use crate::events::{InboundEvent, KnownKind};
use crate::notify::{Notice, NoticeLevel, Notify};

/// Forwards notices derived from events to a [`Notify`] sink.
pub struct EventNotices {
    sink: Arc<dyn Notify>,
}

impl EventNotices {
    /// Creates a handler that sends its notices to `sink`.
    pub fn new(sink: Arc<dyn Notify>) -> Self {
        Self { sink }
    }

    /// Kinds this handler produces notices for.
    pub const KINDS: [KnownKind; 4] = [
        KnownKind::Notification,
        KnownKind::CrawlStart,
        KnownKind::CrawlComplete,
        KnownKind::CrawlError,
    ];
}

/// Builds the notice shown for `event`, if any.
pub fn notice_for(event: &InboundEvent) -> Option<Notice> {
    let notice = match event.known_kind()? {
        KnownKind::Notification => Notice::new(
            event
                .urgency_level()
                .map(NoticeLevel::from_urgency)
                .unwrap_or(NoticeLevel::Info),
            event.title().unwrap_or("Notification"),
            event.message().unwrap_or_default(),
        ),
        KnownKind::CrawlStart => Notice::info("Crawl started", "A crawl has started."),
        KnownKind::CrawlComplete => {
            Notice::success("Crawl complete", "The crawl finished successfully.")
        }
        KnownKind::CrawlError => Notice::error(
            "Crawl failed",
            format!("Crawl failed: {}", event.error().unwrap_or("unknown error")),
        ),
        KnownKind::CrawlProgress | KnownKind::CrawlStatus => return None,
    };
    Some(notice)
}

#[async_trait]
impl Handler for EventNotices {
    async fn handle(&self, event: &InboundEvent) -> Result<(), HandlerError> {
        if let Some(notice) = notice_for(event) {
            self.sink.notify(&notice);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "event-notices"
    }
}
