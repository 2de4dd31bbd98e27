//! # Connection state of the event channel.
//!
//! ```text
//!            handshake ok               transport closed / error
//! Connecting ───────────► Open ───────────────────────────► Closed
//!     ▲  │                                                   │  ▲
//!     │  └────────────── handshake failed ───────────────────┘  │
//!     │                                                         │ backoff timer fires
//!     └──────────── retry attempt ─────── Reconnecting ◄────────┘
//! ```
//!
//! There is no terminal state: the channel cycles until it is closed
//! explicitly, after which it stays `Closed`.

use std::fmt;
use std::time::SystemTime;

/// Lifecycle state of an [`EventChannel`](crate::EventChannel).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// A transport handshake is in progress.
    Connecting,
    /// The transport is connected and frames are being read.
    Open,
    /// No transport. Either waiting for the backoff timer or closed for good.
    #[default]
    Closed,
    /// The backoff timer fired; a new attempt is about to start.
    Reconnecting,
}

impl ChannelState {
    /// Short lowercase name for logs and status indicators.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closed => "closed",
            ChannelState::Reconnecting => "reconnecting",
        }
    }

    /// True when events can currently be received.
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, ChannelState::Open)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed transition, delivered to status subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub previous: ChannelState,
    /// State after the transition.
    pub current: ChannelState,
    /// Wall-clock time of the transition.
    pub at: SystemTime,
}
