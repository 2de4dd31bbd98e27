//! # REST client for the dashboard backend.
//!
//! Refresh targets usually re-fetch a view from one of these routes:
//!
//! ```no_run
//! use crawlfeed::{ApiClient, RefreshFn, RefreshError};
//!
//! # fn wire(api: ApiClient) {
//! let status_cards = RefreshFn::arc(move || {
//!     let api = api.clone();
//!     async move {
//!         let dashboard = api.dashboard().await?;
//!         println!("last refresh {}", dashboard["last_refresh"]);
//!         Ok::<(), RefreshError>(())
//!     }
//! });
//! # let _ = status_cards;
//! # }
//! ```

mod client;
mod error;

pub use client::ApiClient;
pub use error::ApiError;
