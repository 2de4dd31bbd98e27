//! Reconnection policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how reconnect delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization to avoid every dashboard reconnecting at once
//!
//! ## Wiring
//! ```text
//! Config { reconnect: BackoffPolicy, .. }
//!      └─► channel::EventChannel read loop:
//!           ReconnectSchedule (per run)
//!           - transport dropped → next_delay(), one more failure
//!           - successful open   → reset()
//! ```
//!
//! ## Defaults
//! `BackoffPolicy::default()` → first=1s, factor=2.0, max=30s, jitter=Equal.
//! There is no attempt limit: the channel never gives up on its own.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub(crate) use backoff::ReconnectSchedule;
pub use jitter::JitterPolicy;
