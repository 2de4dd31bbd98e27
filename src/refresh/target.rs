//! # Refresh targets.
//!
//! A refresh target is a named view region (`"status-cards"`, `"timeline"`)
//! paired with an idempotent async operation that re-fetches its data and
//! re-renders it. The coordinator only knows the identifier → operation map.
//!
//! ## Example
//! ```rust
//! use crawlfeed::{RefreshError, RefreshFn, RefreshRef};
//!
//! let timeline: RefreshRef = RefreshFn::arc(|| async {
//!     // GET /api/job-history, re-render ...
//!     Ok::<_, RefreshError>(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RefreshError;

/// Shared refresh operation handle.
pub type RefreshRef = Arc<dyn RefreshTarget>;

/// Idempotent re-fetch-and-rerender operation.
#[async_trait]
pub trait RefreshTarget: Send + Sync + 'static {
    /// Re-fetches the data behind the view and re-renders it.
    ///
    /// Must be safe to call repeatedly.
    async fn refresh(&self) -> Result<(), RefreshError>;
}

/// Closure-backed refresh target.
pub struct RefreshFn<F> {
    f: F,
}

impl<F> RefreshFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> RefreshTarget for RefreshFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RefreshError>> + Send + 'static,
{
    async fn refresh(&self) -> Result<(), RefreshError> {
        (self.f)().await
    }
}
