//! Envelopes exchanged with the broker
//!
//! An [`Envelope`] pairs routing metadata ([`MessageInfo`]) with an optional
//! [`Segment`] body. Outbound envelopes are built from console text with
//! [`Envelope::build_outbound`] or an [`OutboundBuilder`]; inbound payloads are
//! turned into envelopes with [`decode_inbound`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;
use crate::segment::Segment;
use crate::stamp::{MessageStamper, Stamp};
use crate::types::{json_kind, string_or_number, GroupContext, Identity};

// ----------------------------------------------------------------------------
// Envelope Types
// ----------------------------------------------------------------------------

/// Routing metadata of an envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub platform: String,
    #[serde(deserialize_with = "string_or_number")]
    pub message_id: String,
    /// Seconds since the Unix epoch
    #[serde(rename = "time")]
    pub timestamp: f64,
    #[serde(rename = "user_info")]
    pub sender: Identity,
    #[serde(rename = "group_info", default)]
    pub group: Option<GroupContext>,
}

/// A structured unit of communication with the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "message_info")]
    pub info: MessageInfo,
    #[serde(rename = "message_segment", default)]
    pub body: Option<Segment>,
}

impl Envelope {
    /// Wrap console text into an outbound envelope
    ///
    /// The body is always a `seglist` holding exactly one `text` leaf. Empty
    /// text is accepted; filtering blank input is the caller's job.
    pub fn build_outbound(
        text: &str,
        sender: &Identity,
        group: Option<&GroupContext>,
        stamp: Stamp,
    ) -> Self {
        Self {
            info: MessageInfo {
                platform: sender.platform.clone(),
                message_id: stamp.message_id,
                timestamp: stamp.timestamp,
                sender: sender.clone(),
                group: group.cloned(),
            },
            body: Some(Segment::list(vec![Segment::text(text)])),
        }
    }

    /// Encode into the broker's JSON representation
    pub fn encode(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Encode into a JSON text frame
    pub fn encode_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Whether the envelope targets a group rather than a direct conversation
    pub fn is_group(&self) -> bool {
        self.info.group.is_some()
    }
}

// ----------------------------------------------------------------------------
// Inbound Decoding
// ----------------------------------------------------------------------------

/// Decode a raw inbound payload into an [`Envelope`]
///
/// Fails with [`DecodeError`] when the payload is not an object, when
/// required fields are missing, or when a segment is structurally malformed.
pub fn decode_inbound(raw: &Value) -> Result<Envelope, DecodeError> {
    if !raw.is_object() {
        return Err(DecodeError::NotAnObject {
            found: json_kind(raw),
        });
    }
    Envelope::deserialize(raw).map_err(DecodeError::Malformed)
}

/// Parse a JSON text frame and decode it
pub fn decode_text(text: &str) -> Result<Envelope, DecodeError> {
    let raw: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;
    decode_inbound(&raw)
}

// ----------------------------------------------------------------------------
// Outbound Builder
// ----------------------------------------------------------------------------

/// Builds outbound envelopes for one configured session identity
#[derive(Debug)]
pub struct OutboundBuilder {
    sender: Identity,
    group: Option<GroupContext>,
    stamper: MessageStamper,
}

impl OutboundBuilder {
    pub fn new(sender: Identity, group: Option<GroupContext>) -> Self {
        Self::with_stamper(sender, group, MessageStamper::new())
    }

    pub fn with_stamper(
        sender: Identity,
        group: Option<GroupContext>,
        stamper: MessageStamper,
    ) -> Self {
        Self {
            sender,
            group,
            stamper,
        }
    }

    /// Build an envelope for one line of console text
    pub fn build(&self, text: &str) -> Envelope {
        Envelope::build_outbound(text, &self.sender, self.group.as_ref(), self.stamper.issue())
    }

    pub fn sender(&self) -> &Identity {
        &self.sender
    }

    pub fn group(&self) -> Option<&GroupContext> {
        self.group.as_ref()
    }
}
