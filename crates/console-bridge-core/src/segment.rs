//! Message segments
//!
//! A segment is either a leaf `(type, data)` pair with an opaque JSON payload,
//! or a `seglist` whose data is an ordered list of child segments. On the wire
//! both shapes are `{"type": ..., "data": ...}` objects; the tag decides how
//! `data` is interpreted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::json_kind;

/// Tag used by composite segments
pub const SEGLIST_TAG: &str = "seglist";

/// Tag used by plain text leaves
pub const TEXT_TAG: &str = "text";

// ----------------------------------------------------------------------------
// Segment
// ----------------------------------------------------------------------------

/// A tagged content unit
///
/// Build leaves through [`Segment::leaf`] or [`Segment::text`]; a leaf must not
/// carry the `seglist` tag, otherwise it would not survive an encode/decode
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireSegment", into = "WireSegment")]
pub enum Segment {
    /// Leaf with an opaque payload
    Leaf { kind: String, data: Value },
    /// Ordered list of child segments
    List(Vec<Segment>),
}

impl Segment {
    /// Create a leaf segment
    pub fn leaf(kind: impl Into<String>, data: Value) -> Self {
        Segment::Leaf {
            kind: kind.into(),
            data,
        }
    }

    /// Create a `text` leaf
    pub fn text(content: impl Into<String>) -> Self {
        Segment::leaf(TEXT_TAG, Value::String(content.into()))
    }

    /// Create a `seglist` from children
    pub fn list(children: Vec<Segment>) -> Self {
        Segment::List(children)
    }

    /// The segment's wire tag
    pub fn kind(&self) -> &str {
        match self {
            Segment::Leaf { kind, .. } => kind,
            Segment::List(_) => SEGLIST_TAG,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Segment::List(_))
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<(&str, &Value)> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<(&'a str, &'a Value)>) {
        match self {
            Segment::Leaf { kind, data } => out.push((kind, data)),
            Segment::List(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    fn to_wire_value(&self) -> Value {
        match self {
            Segment::Leaf { kind, data } => json!({ "type": kind, "data": data }),
            Segment::List(children) => json!({
                "type": SEGLIST_TAG,
                "data": children.iter().map(Segment::to_wire_value).collect::<Vec<_>>(),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Wire Form
// ----------------------------------------------------------------------------

/// Untyped wire representation of a segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSegment {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

/// Structural problems found while converting a [`WireSegment`]
#[derive(Debug, thiserror::Error)]
pub enum SegmentShapeError {
    #[error("seglist data must be a sequence, got {found}")]
    ListNotSequence { found: &'static str },
    #[error("invalid seglist child at index {index}: {reason}")]
    InvalidChild { index: usize, reason: String },
}

impl TryFrom<WireSegment> for Segment {
    type Error = SegmentShapeError;

    fn try_from(wire: WireSegment) -> Result<Self, Self::Error> {
        if wire.kind != SEGLIST_TAG {
            return Ok(Segment::Leaf {
                kind: wire.kind,
                data: wire.data,
            });
        }

        let items = match wire.data {
            Value::Array(items) => items,
            other => {
                return Err(SegmentShapeError::ListNotSequence {
                    found: json_kind(&other),
                })
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Segment>(item).map_err(|e| {
                    SegmentShapeError::InvalidChild {
                        index,
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Segment::List)
    }
}

impl From<Segment> for WireSegment {
    fn from(segment: Segment) -> Self {
        match segment {
            Segment::Leaf { kind, data } => WireSegment { kind, data },
            Segment::List(children) => WireSegment {
                kind: SEGLIST_TAG.to_string(),
                data: Value::Array(children.iter().map(Segment::to_wire_value).collect()),
            },
        }
    }
}
