//! # WebSocket transport (tokio-tungstenite).
//!
//! Control frames are handled by tungstenite: pings are answered while the
//! stream is read, pongs are ignored, and a close frame ends the stream.

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::channel::transport::{Frame, FrameStream, Transport};
use crate::error::ChannelError;

/// [`Transport`] over `ws://` / `wss://`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    /// Creates a transport with tungstenite's default connection settings.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &Url) -> Result<FrameStream, ChannelError> {
        let (ws, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::transport(url.as_str(), e))?;
        tracing::debug!(url = %url, status = %response.status(), "websocket handshake complete");

        let target = url.to_string();
        let frames = ws.filter_map(move |msg| {
            let out = match msg {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes.to_vec()))),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(url = %target, frame = ?frame, "server sent close frame");
                    None
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
                Err(e) => Some(Err(ChannelError::transport(target.as_str(), e))),
            };
            futures::future::ready(out)
        });
        Ok(frames.boxed())
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}
