//! Error types used by the feed runtime, handlers and refresh operations.
//!
//! This module defines the failure taxonomy of the subsystem:
//!
//! - [`ChannelError`]: transport and frame-level failures of the event channel.
//! - [`HandlerError`]: failures raised by registered event handlers.
//! - [`RefreshError`]: failures of refresh operations (view re-fetch).
//!
//! None of these is fatal to the feed: transport failures are recovered by
//! reconnection, parse failures discard one frame, handler and refresh failures
//! are isolated and reported. All types provide `as_label` / `as_message`
//! helpers for logs.

use std::borrow::Cow;

use thiserror::Error;

/// # Errors produced by the event channel.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Connection dropped or could not be opened. Recovered by reconnection.
    #[error("transport error on {url}: {error}")]
    Transport {
        /// Endpoint the channel was talking to.
        url: String,
        /// The underlying transport error message.
        error: String,
    },

    /// A frame body is not a JSON object with a string `type` field.
    /// The frame is discarded; the channel keeps running.
    #[error("malformed frame: {reason}")]
    Parse {
        /// Why the frame was rejected.
        reason: String,
    },

    /// The endpoint URL cannot be used for the feed.
    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `open` was called on a channel that already runs a connection loop.
    #[error("channel already open")]
    AlreadyOpen,

    /// The channel was closed explicitly and accepts no more work.
    #[error("channel closed")]
    Closed,

    /// No transport was configured and no default one is compiled in.
    #[error("no transport configured")]
    NoTransport,
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use crawlfeed::ChannelError;
    ///
    /// let err = ChannelError::Parse { reason: "missing type".into() };
    /// assert_eq!(err.as_label(), "channel_parse");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Transport { .. } => "channel_transport",
            ChannelError::Parse { .. } => "channel_parse",
            ChannelError::InvalidEndpoint { .. } => "channel_invalid_endpoint",
            ChannelError::AlreadyOpen => "channel_already_open",
            ChannelError::Closed => "channel_closed",
            ChannelError::NoTransport => "channel_no_transport",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ChannelError::Transport { url, error } => format!("transport {url}: {error}"),
            ChannelError::Parse { reason } => format!("parse: {reason}"),
            ChannelError::InvalidEndpoint { url, reason } => format!("endpoint {url}: {reason}"),
            ChannelError::AlreadyOpen => "channel already open".to_string(),
            ChannelError::Closed => "channel closed".to_string(),
            ChannelError::NoTransport => "no transport configured".to_string(),
        }
    }

    /// Indicates whether the channel recovers from this error by reconnecting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ChannelError::Transport { .. })
    }

    pub(crate) fn transport(url: impl Into<String>, error: impl ToString) -> Self {
        ChannelError::Transport {
            url: url.into(),
            error: error.to_string(),
        }
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        ChannelError::Parse {
            reason: reason.into(),
        }
    }
}

/// # Errors produced by event handlers.
///
/// A failing handler never stops dispatch: the error is logged and the
/// remaining handlers for the event still run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handler returned an error.
    #[error("handler failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; the panic was caught by the dispatcher.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HandlerError {
    /// Convenience constructor for [`HandlerError::Failed`].
    pub fn failed(error: impl ToString) -> Self {
        HandlerError::Failed {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Failed { error } => format!("error: {error}"),
            HandlerError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// # Errors produced by refresh operations.
///
/// Reported to the user as a transient notice; the target is refreshed again
/// on the next natural trigger, never retried automatically.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The refresh operation returned an error.
    #[error("refresh of '{target}' failed: {error}")]
    Failed {
        /// Refresh target identifier.
        target: String,
        /// The underlying error message.
        error: String,
    },

    /// The refresh operation panicked.
    #[error("refresh of '{target}' panicked: {info}")]
    Panicked {
        /// Refresh target identifier.
        target: String,
        /// Panic payload rendered as text.
        info: String,
    },

    /// The backing REST call failed.
    #[cfg(feature = "rest")]
    #[error("refresh api call failed: {0}")]
    Api(#[from] crate::api::ApiError),
}

impl RefreshError {
    /// Convenience constructor for [`RefreshError::Failed`].
    pub fn failed(target: impl Into<String>, error: impl ToString) -> Self {
        RefreshError::Failed {
            target: target.into(),
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RefreshError::Failed { .. } => "refresh_failed",
            RefreshError::Panicked { .. } => "refresh_panicked",
            #[cfg(feature = "rest")]
            RefreshError::Api(_) => "refresh_api",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RefreshError::Failed { target, error } => format!("{target}: {error}"),
            RefreshError::Panicked { target, info } => format!("{target}: panic: {info}"),
            #[cfg(feature = "rest")]
            RefreshError::Api(e) => e.as_message(),
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> Cow<'static, str> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Cow::Owned(s.clone())
    } else {
        Cow::Borrowed("non-string panic payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(ChannelError::Closed.as_label(), "channel_closed");
        assert_eq!(
            ChannelError::transport("ws://h/ws/crawl", "refused").as_label(),
            "channel_transport"
        );
        assert_eq!(HandlerError::failed("x").as_label(), "handler_failed");
        assert_eq!(
            RefreshError::failed("timeline", "503").as_label(),
            "refresh_failed"
        );
    }

    #[test]
    fn only_transport_errors_recover_by_reconnect() {
        assert!(ChannelError::transport("u", "reset").is_recoverable());
        assert!(!ChannelError::parse("bad json").is_recoverable());
        assert!(!ChannelError::Closed.is_recoverable());
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }

    #[test]
    fn refresh_error_message_names_target() {
        let err = RefreshError::failed("status-cards", "timeout");
        assert_eq!(err.as_message(), "status-cards: timeout");
        assert_eq!(
            err.to_string(),
            "refresh of 'status-cards' failed: timeout"
        );
    }
}
