//! Console Bridge Core
//!
//! This crate provides the envelope model exchanged with a message broker, the
//! JSON codec for it, and the transport contract the session controller drives.
//! It has no knowledge of terminals or sockets.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod envelope;
pub mod errors;
pub mod segment;
pub mod stamp;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ConnectPolicy, EndpointConfig, SessionConfig};
pub use envelope::{decode_inbound, decode_text, Envelope, MessageInfo, OutboundBuilder};
pub use errors::{BridgeError, DecodeError, Result, TransportError};
pub use segment::{Segment, SegmentShapeError, SEGLIST_TAG, TEXT_TAG};
pub use stamp::{MessageStamper, Stamp, MESSAGE_ID_PREFIX};
pub use transport::{
    create_inbound_channel, InboundReceiver, InboundSender, Transport, DEFAULT_INBOUND_BUFFER,
};
pub use types::{GroupContext, Identity};
