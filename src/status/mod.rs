//! Connection status.
//!
//! - [`ChannelState`]: connecting / open / closed / reconnecting
//! - [`ConnectionStatusReporter`]: current state + ordered transition broadcast
//!
//! ```text
//! EventChannel read loop ── set(state) ──► ConnectionStatusReporter
//!                                            ├─► callback 1 (status indicator)
//!                                            ├─► callback N
//!                                            └─► watch::Receiver (async observers)
//! ```

mod reporter;
mod state;

pub use reporter::{ConnectionStatusReporter, SubscriptionId};
pub use state::{ChannelState, StateChange};
