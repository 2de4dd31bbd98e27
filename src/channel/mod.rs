//! # Event channel.
//!
//! - [`Endpoint`]: feed URL derived from the dashboard origin
//! - [`Transport`] / [`Frame`]: connection seam, [`WsTransport`] over tokio-tungstenite
//! - [`EventChannel`]: connection loop, reconnection and frame parsing

mod event_channel;
mod endpoint;
mod transport;
#[cfg(feature = "ws")]
mod ws;

pub use event_channel::EventChannel;
pub use endpoint::{Endpoint, FEED_PATH};
pub use transport::{Frame, FrameStream, Transport};
#[cfg(feature = "ws")]
pub use ws::WsTransport;
