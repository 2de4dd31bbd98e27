//! # Inbound events parsed from transport frames.
//!
//! An [`InboundEvent`] is built from exactly one text frame. The frame must be a
//! JSON object with a string `type`; everything else is kept as an opaque
//! payload and exposed through typed accessors for the fields the backend is
//! known to send.
//!
//! ## Ordering
//! Each event carries a process-wide sequence number (`seq`) assigned at parse
//! time, so log lines from the read loop and the dispatcher can be correlated.
//!
//! ## Example
//! ```rust
//! use crawlfeed::{InboundEvent, KnownKind};
//!
//! let ev = InboundEvent::parse(r#"{"type":"crawl_error","error":"timeout"}"#).unwrap();
//! assert_eq!(ev.kind(), "crawl_error");
//! assert_eq!(ev.known_kind(), Some(KnownKind::CrawlError));
//! assert_eq!(ev.error(), Some("timeout"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::error::ChannelError;
use crate::events::kind::KnownKind;

/// Global sequence counter for inbound events.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Field carrying the event kind in every frame.
pub const TYPE_FIELD: &str = "type";

/// One event received from the channel.
///
/// - `kind`: value of the frame's `type` field
/// - `payload`: the full JSON object, `type` included
/// - `seq`: monotonic sequence number assigned on construction
#[derive(Clone, Debug)]
pub struct InboundEvent {
    seq: u64,
    kind: String,
    payload: Map<String, Value>,
}

impl InboundEvent {
    /// Creates an event of the given kind with a payload containing only `type`.
    pub fn new(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        let mut payload = Map::new();
        payload.insert(TYPE_FIELD.to_string(), Value::String(kind.clone()));
        Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            kind,
            payload,
        }
    }

    /// Parses a single frame body.
    ///
    /// Fails with [`ChannelError::Parse`] when the body is not JSON, is not an
    /// object, or has no string `type` field.
    pub fn parse(frame: &str) -> Result<Self, ChannelError> {
        let value: Value = serde_json::from_str(frame)
            .map_err(|e| ChannelError::parse(format!("invalid json: {e}")))?;
        Self::from_value(value)
    }

    /// Builds an event from an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, ChannelError> {
        let Value::Object(payload) = value else {
            return Err(ChannelError::parse("frame is not a json object"));
        };
        let kind = match payload.get(TYPE_FIELD) {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            Some(Value::String(_)) => return Err(ChannelError::parse("empty `type` field")),
            Some(_) => return Err(ChannelError::parse("`type` field is not a string")),
            None => return Err(ChannelError::parse("missing `type` field")),
        };
        Ok(Self {
            seq: EVENT_SEQ.fetch_add(1, Ordering::Relaxed),
            kind,
            payload,
        })
    }

    /// Attaches an extra payload field.
    #[inline]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if name != TYPE_FIELD {
            self.payload.insert(name, value.into());
        }
        self
    }

    /// Sequence number assigned at construction.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The declared event kind.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The kind as a recognised variant, if it is one.
    pub fn known_kind(&self) -> Option<KnownKind> {
        self.kind.parse().ok()
    }

    /// The raw JSON object.
    #[inline]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Any field, as raw JSON.
    #[inline]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// A string field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// `title` of a notification.
    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    /// `message` of a notification.
    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    /// `error` text of a failed crawl.
    pub fn error(&self) -> Option<&str> {
        self.str_field("error")
    }

    /// `status` line of a running crawl.
    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }

    /// `urgency_level` of a notification.
    pub fn urgency_level(&self) -> Option<&str> {
        self.str_field("urgency_level")
    }

    /// Server-side ISO-8601 `timestamp`, unparsed.
    pub fn timestamp(&self) -> Option<&str> {
        self.str_field("timestamp")
    }

    /// `progress` in percent. Accepts numbers and numeric strings.
    pub fn progress(&self) -> Option<f64> {
        match self.payload.get("progress")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        }
    }

    /// Crawl `choice` (site selector). The backend sends it as a string or a number.
    pub fn choice(&self) -> Option<String> {
        match self.payload.get("choice")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_frame() {
        let ev = InboundEvent::parse(r#"{"type":"crawl_start"}"#).unwrap();
        assert_eq!(ev.kind(), "crawl_start");
        assert_eq!(ev.known_kind(), Some(KnownKind::CrawlStart));
        assert_eq!(ev.payload().len(), 1);
    }

    #[test]
    fn rejects_malformed_frames() {
        for frame in [
            "not json",
            "[1,2,3]",
            r#""crawl_start""#,
            r#"{"kind":"crawl_start"}"#,
            r#"{"type":42}"#,
            r#"{"type":""}"#,
            "",
        ] {
            let err = InboundEvent::parse(frame).unwrap_err();
            assert_eq!(err.as_label(), "channel_parse", "frame {frame:?}");
        }
    }

    #[test]
    fn unknown_kind_still_parses() {
        let ev = InboundEvent::parse(r#"{"type":"unknown_future_type","x":1}"#).unwrap();
        assert_eq!(ev.kind(), "unknown_future_type");
        assert_eq!(ev.known_kind(), None);
        assert_eq!(ev.field("x"), Some(&json!(1)));
    }

    #[test]
    fn typed_accessors() {
        let ev = InboundEvent::parse(
            r#"{"type":"notification","title":"New rulings","message":"3 new",
                "urgency_level":"high","timestamp":"2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(ev.title(), Some("New rulings"));
        assert_eq!(ev.message(), Some("3 new"));
        assert_eq!(ev.urgency_level(), Some("high"));
        assert_eq!(ev.timestamp(), Some("2024-05-01T10:00:00"));
        assert_eq!(ev.error(), None);
    }

    #[test]
    fn progress_and_choice_accept_loose_types() {
        let ev = InboundEvent::new("crawl_progress")
            .with_field("progress", "42.5%")
            .with_field("choice", 3);
        assert_eq!(ev.progress(), Some(42.5));
        assert_eq!(ev.choice().as_deref(), Some("3"));

        let ev = InboundEvent::new("crawl_status")
            .with_field("progress", 80)
            .with_field("choice", "all");
        assert_eq!(ev.progress(), Some(80.0));
        assert_eq!(ev.choice().as_deref(), Some("all"));
    }

    #[test]
    fn with_field_cannot_rewrite_type() {
        let ev = InboundEvent::new("notification").with_field("type", "crawl_error");
        assert_eq!(ev.kind(), "notification");
        assert_eq!(ev.str_field("type"), Some("notification"));
    }

    #[test]
    fn sequence_is_monotonic() {
        let a = InboundEvent::new("a");
        let b = InboundEvent::new("b");
        assert!(b.seq() > a.seq());
    }
}
