//! # Transport seam.
//!
//! The event channel does not talk to sockets directly. A [`Transport`] opens
//! one connection and hands back a stream of frames; the stream ending (or
//! yielding an error) means the connection is gone. Dropping the stream closes
//! the connection.
//!
//! ```text
//! Transport::connect(url) ──► FrameStream
//!                               ├─ Some(Ok(Frame::Text))   → parse + dispatch
//!                               ├─ Some(Ok(Frame::Binary)) → utf-8 decode, then as text
//!                               ├─ Some(Err(e))            → connection lost
//!                               └─ None                    → closed by peer
//! ```
//!
//! The production implementation is `WsTransport` (feature `ws`); tests plug in
//! scripted transports.

use async_trait::async_trait;
use futures::stream::BoxStream;
use url::Url;

use crate::error::ChannelError;

/// One application frame received from the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Frames of a single live connection.
pub type FrameStream = BoxStream<'static, Result<Frame, ChannelError>>;

/// Opens connections for the event channel.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs the handshake and returns the inbound frame stream.
    async fn connect(&self, url: &Url) -> Result<FrameStream, ChannelError>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
