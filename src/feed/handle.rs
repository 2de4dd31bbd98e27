use std::sync::{Arc, OnceLock};

use crate::refresh::RefreshCoordinator;

/// Lets handlers mark refresh targets dirty.
///
/// Handlers are registered before the feed is built, while the coordinator
/// only exists afterwards; the handle is bound by
/// [`LiveFeedBuilder::build`](crate::LiveFeedBuilder::build). Marks made before
/// that are ignored with a warning.
#[derive(Clone, Default)]
pub struct RefreshHandle {
    inner: Arc<OnceLock<RefreshCoordinator>>,
}

impl RefreshHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&self, coordinator: RefreshCoordinator) {
        if self.inner.set(coordinator).is_err() {
            tracing::warn!("refresh handle already bound");
        }
    }

    /// Marks `target` stale. Returns `false` when the target is unknown or
    /// the feed is not built or already closed.
    pub fn mark_dirty(&self, target: &str) -> bool {
        match self.inner.get() {
            Some(c) => c.mark_dirty(target),
            None => {
                tracing::warn!(target, "refresh handle used before the feed was built");
                false
            }
        }
    }

    /// Marks several targets stale. Returns how many marks were accepted.
    pub fn mark_all<'a>(&self, targets: impl IntoIterator<Item = &'a str>) -> usize {
        targets.into_iter().filter(|t| self.mark_dirty(t)).count()
    }

    /// The bound coordinator, once the feed is built.
    pub fn coordinator(&self) -> Option<&RefreshCoordinator> {
        self.inner.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::refresh::{RefreshFn, RefreshRef};
    use crate::error::RefreshError;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn unbound_handle_refuses_marks() {
        let h = RefreshHandle::new();
        assert!(!h.mark_dirty("status-cards"));
        assert!(h.coordinator().is_none());
    }

    #[tokio::test]
    async fn bound_handle_forwards_to_coordinator() {
        let h = RefreshHandle::new();
        let noop: RefreshRef = RefreshFn::arc(|| async { Ok::<(), RefreshError>(()) });
        let mut targets = BTreeMap::new();
        targets.insert("timeline".to_string(), noop);
        h.bind(RefreshCoordinator::spawn(
            targets,
            Duration::from_millis(10),
            None,
            Arc::new(LogNotifier::new()),
            CancellationToken::new(),
        ));

        let clone = h.clone();
        assert!(clone.mark_dirty("timeline"));
        assert!(!clone.mark_dirty("nope"));
        assert_eq!(h.mark_all(["timeline", "nope"]), 1);
    }
}
