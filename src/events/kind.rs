//! # Event kinds the backend is known to send.
//!
//! Dispatch matches on the raw `type` string, so kinds missing here still reach
//! handlers registered for them. [`KnownKind`] is a convenience for handler
//! registration and logging.

use std::fmt;
use std::str::FromStr;

/// Recognised values of the frame `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KnownKind {
    /// A new notification was stored (fields: `title`, `message`, `urgency_level`).
    Notification,
    /// A crawl job started (fields: `choice`).
    CrawlStart,
    /// Progress of a running crawl (fields: `progress`).
    CrawlProgress,
    /// Status line of a running crawl (fields: `status`, optional `progress`).
    CrawlStatus,
    /// A crawl finished successfully (fields: `choice`).
    CrawlComplete,
    /// A crawl failed (fields: `error`).
    CrawlError,
}

impl KnownKind {
    /// All recognised kinds.
    pub const ALL: [KnownKind; 6] = [
        KnownKind::Notification,
        KnownKind::CrawlStart,
        KnownKind::CrawlProgress,
        KnownKind::CrawlStatus,
        KnownKind::CrawlComplete,
        KnownKind::CrawlError,
    ];

    /// Wire value of the kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KnownKind::Notification => "notification",
            KnownKind::CrawlStart => "crawl_start",
            KnownKind::CrawlProgress => "crawl_progress",
            KnownKind::CrawlStatus => "crawl_status",
            KnownKind::CrawlComplete => "crawl_complete",
            KnownKind::CrawlError => "crawl_error",
        }
    }

    /// True for the crawl job lifecycle kinds.
    pub const fn is_crawl(&self) -> bool {
        !matches!(self, KnownKind::Notification)
    }

    /// True when the crawl reached a final state.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, KnownKind::CrawlComplete | KnownKind::CrawlError)
    }
}

impl fmt::Display for KnownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or(())
    }
}

impl From<KnownKind> for String {
    fn from(kind: KnownKind) -> Self {
        kind.as_str().to_string()
    }
}
