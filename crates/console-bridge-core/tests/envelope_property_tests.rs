//! Property-based tests for the envelope codec
//!
//! These tests verify that decoding is a left-inverse of encoding, that
//! outbound envelopes always carry a single text leaf, and that malformed
//! seglists are rejected as decode errors.

use console_bridge_core::{
    decode_inbound, decode_text, DecodeError, Envelope, GroupContext, Identity, MessageInfo,
    MessageStamper, Segment, SEGLIST_TAG,
};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Generate a leaf tag that is never the composite tag
fn arb_leaf_kind() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z_]{1,12}")
        .unwrap()
        .prop_filter("leaf must not use the seglist tag", |kind| kind != SEGLIST_TAG)
}

/// Generate opaque leaf payloads
fn arb_leaf_data() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<String>().prop_map(Value::String),
        any::<i64>().prop_map(|n| json!(n)),
        any::<bool>().prop_map(Value::Bool),
        (any::<String>(), any::<u32>()).prop_map(|(k, v)| json!({ "key": k, "value": v })),
    ]
}

/// Generate segment trees up to a small depth
fn arb_segment() -> impl Strategy<Value = Segment> {
    let leaf = (arb_leaf_kind(), arb_leaf_data()).prop_map(|(kind, data)| Segment::leaf(kind, data));
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop::collection::vec(inner, 1..4).prop_map(Segment::list)
    })
}

fn arb_identity() -> impl Strategy<Value = Identity> {
    ("[a-z_]{1,16}", "[a-zA-Z0-9_]{1,16}", any::<String>())
        .prop_map(|(platform, user_id, nickname)| Identity::new(platform, user_id, nickname))
}

fn arb_group() -> impl Strategy<Value = Option<GroupContext>> {
    prop::option::of(
        ("[a-z_]{1,16}", "[0-9]{1,10}", any::<String>())
            .prop_map(|(platform, id, name)| GroupContext::new(platform, id, name)),
    )
}

fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (
        arb_identity(),
        arb_group(),
        "[a-z0-9_.]{1,32}",
        0u64..4_000_000_000u64,
        prop::option::of(arb_segment()),
    )
        .prop_map(|(sender, group, message_id, secs, body)| Envelope {
            info: MessageInfo {
                platform: sender.platform.clone(),
                message_id,
                timestamp: secs as f64 + 0.25,
                sender,
                group,
            },
            body,
        })
}

proptest! {
    /// Property: decoding an encoded envelope yields the original envelope
    #[test]
    fn decode_is_left_inverse_of_encode(envelope in arb_envelope()) {
        let encoded = envelope.encode().unwrap();
        let decoded = decode_inbound(&encoded).unwrap();
        prop_assert_eq!(decoded, envelope);
    }

    /// Property: the same holds through a JSON text frame
    #[test]
    fn decode_text_is_left_inverse_of_encode_text(envelope in arb_envelope()) {
        let frame = envelope.encode_text().unwrap();
        let decoded = decode_text(&frame).unwrap();
        prop_assert_eq!(decoded, envelope);
    }

    /// Property: outbound envelopes wrap the text as exactly one text leaf
    #[test]
    fn outbound_body_is_single_text_leaf(
        text in "[^\\s].{0,200}",
        sender in arb_identity(),
        group in arb_group(),
    ) {
        let stamper = MessageStamper::new();
        let envelope = Envelope::build_outbound(&text, &sender, group.as_ref(), stamper.issue());

        let body = envelope.body.expect("outbound envelopes always carry a body");
        prop_assert!(body.is_list());
        let leaves = body.leaves();
        prop_assert_eq!(leaves.len(), 1);
        prop_assert_eq!(leaves[0].0, "text");
        prop_assert_eq!(leaves[0].1.as_str(), Some(text.as_str()));
        prop_assert_eq!(envelope.info.sender, sender);
        prop_assert_eq!(envelope.info.group, group);
    }

    /// Property: a seglist with non-sequence data only ever fails as a decode error
    #[test]
    fn seglist_with_scalar_data_is_decode_error(data in arb_leaf_data()) {
        let raw = json!({
            "message_info": {
                "platform": "console_adapter",
                "message_id": "m",
                "time": 1.0,
                "user_info": {"platform": "console_adapter", "user_id": "u"}
            },
            "message_segment": {"type": SEGLIST_TAG, "data": data}
        });
        prop_assert!(matches!(decode_inbound(&raw), Err(DecodeError::Malformed(_))));
    }

    /// Property: ids stay unique regardless of clock behaviour
    #[test]
    fn stamper_ids_are_unique(readings in prop::collection::vec(0u64..10_000_000, 1..64)) {
        let readings = std::sync::Arc::new(readings);
        let cursor = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let clock_readings = std::sync::Arc::clone(&readings);
        let clock_cursor = std::sync::Arc::clone(&cursor);
        let stamper = MessageStamper::with_clock(move || {
            let i = clock_cursor.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            clock_readings[i % clock_readings.len()]
        });

        let mut ids = std::collections::HashSet::new();
        let mut last = 0.0f64;
        for _ in 0..readings.len() {
            let stamp = stamper.issue();
            prop_assert!(stamp.timestamp >= last);
            last = stamp.timestamp;
            prop_assert!(ids.insert(stamp.message_id));
        }
    }
}
