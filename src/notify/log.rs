//! # LogNotifier: notices as log lines
//!
//! Default [`Notify`] sink. Maps notice levels onto `tracing` levels:
//!
//! ```text
//! Info, Success → info
//! Warning       → warn
//! Error         → error
//! ```

use crate::notify::{Notice, NoticeLevel, Notify};

/// Writes notices through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notify for LogNotifier {
    fn notify(&self, n: &Notice) {
        match n.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(level = %n.level, title = %n.title, "{}", n.message);
            }
            NoticeLevel::Warning => {
                tracing::warn!(title = %n.title, "{}", n.message);
            }
            NoticeLevel::Error => {
                tracing::error!(title = %n.title, "{}", n.message);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogNotifier"
    }
}
