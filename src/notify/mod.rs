//! # Notices for the user.
//!
//! Failures that the user should know about (a view failed to refresh) are
//! surfaced as [`Notice`]s through a [`Notify`] sink. The embedding UI supplies
//! its own sink to render toasts; [`LogNotifier`] writes them to `tracing`.
//!
//! ## Rules
//! - `notify` is called from runtime tasks and must not block.
//! - A notifier must not panic; the refresh coordinator still guards the call.

mod events;
mod log;
mod notice;

pub use events::{EventNotices, notice_for};
pub use log::LogNotifier;
pub use notice::{Notice, NoticeLevel};

/// Sink for user-visible notices.
pub trait Notify: Send + Sync + 'static {
    /// Delivers one notice.
    fn notify(&self, notice: &Notice);

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
