//! # Feed endpoints.
//!
//! The feed lives at `/ws/crawl` on the same host that served the dashboard.
//! The WebSocket scheme follows the page: `http → ws`, `https → wss`.
//!
//! ```rust
//! use crawlfeed::Endpoint;
//!
//! let ep = Endpoint::from_origin("https://monitor.example.com:8443/dashboard").unwrap();
//! assert_eq!(ep.ws_url().as_str(), "wss://monitor.example.com:8443/ws/crawl");
//! assert_eq!(ep.api_base().as_str(), "https://monitor.example.com:8443/");
//! ```

use std::fmt;

use url::Url;

use crate::error::ChannelError;

/// Path of the event feed on the dashboard host.
pub const FEED_PATH: &str = "/ws/crawl";

/// WebSocket URL of the feed plus the matching REST base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    ws: Url,
    api: Url,
}

impl Endpoint {
    /// Derives both URLs from the page origin (`http(s)://host[:port]/...`).
    ///
    /// A `ws://` or `wss://` URL is accepted too; its path is kept as given.
    pub fn from_origin(origin: &str) -> Result<Self, ChannelError> {
        let parsed = Url::parse(origin).map_err(|e| invalid(origin, e))?;
        if parsed.host_str().is_none() {
            return Err(invalid(origin, "missing host"));
        }

        let (ws_scheme, http_scheme, keep_path) = match parsed.scheme() {
            "http" => ("ws", "http", false),
            "https" => ("wss", "https", false),
            "ws" => ("ws", "http", true),
            "wss" => ("wss", "https", true),
            other => return Err(invalid(origin, format!("unsupported scheme '{other}'"))),
        };

        let mut ws = parsed.clone();
        ws.set_scheme(ws_scheme)
            .map_err(|()| invalid(origin, "cannot switch to websocket scheme"))?;
        if !keep_path {
            ws.set_path(FEED_PATH);
        }
        ws.set_query(None);
        ws.set_fragment(None);

        let mut api = parsed;
        api.set_scheme(http_scheme)
            .map_err(|()| invalid(origin, "cannot switch to http scheme"))?;
        api.set_path("/");
        api.set_query(None);
        api.set_fragment(None);

        Ok(Self { ws, api })
    }

    /// URL the event channel connects to.
    pub fn ws_url(&self) -> &Url {
        &self.ws
    }

    /// Base URL for REST calls (`/api/...` is joined onto it).
    pub fn api_base(&self) -> &Url {
        &self.api
    }

    /// True when the feed runs over TLS.
    pub fn is_secure(&self) -> bool {
        self.ws.scheme() == "wss"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ws.as_str())
    }
}

fn invalid(origin: &str, reason: impl ToString) -> ChannelError {
    ChannelError::InvalidEndpoint {
        url: origin.to_string(),
        reason: reason.to_string(),
    }
}
