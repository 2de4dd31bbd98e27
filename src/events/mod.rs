//! Inbound events.
//!
//! - [`InboundEvent`]: one parsed frame (`kind` + opaque JSON payload)
//! - [`KnownKind`]: the event kinds the backend is known to send
//!
//! ```text
//! transport frame ──► InboundEvent::parse ──► Ok(event)  ──► dispatch queue
//!                                         └─► Err(Parse) ──► warn, frame discarded
//! ```

mod event;
mod kind;

pub use event::{InboundEvent, TYPE_FIELD};
pub use kind::KnownKind;
