//! Identity types carried in every envelope
//!
//! The wire names follow the broker's message schema (`user_info`,
//! `group_info`, `user_nickname`), while the Rust names describe what the
//! fields mean to the bridge.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ----------------------------------------------------------------------------
// Sender Identity
// ----------------------------------------------------------------------------

/// Who sent a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub platform: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(rename = "user_nickname", default)]
    pub nickname: String,
}

impl Identity {
    pub fn new(
        platform: impl Into<String>,
        user_id: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            user_id: user_id.into(),
            nickname: nickname.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Group Context
// ----------------------------------------------------------------------------

/// Group a message belongs to; absent for direct messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupContext {
    pub platform: String,
    #[serde(deserialize_with = "string_or_number")]
    pub group_id: String,
    #[serde(default)]
    pub group_name: String,
}

impl GroupContext {
    pub fn new(
        platform: impl Into<String>,
        group_id: impl Into<String>,
        group_name: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            group_id: group_id.into(),
            group_name: group_name.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Serde Helpers
// ----------------------------------------------------------------------------

/// Accept ids encoded either as JSON strings or as JSON numbers
///
/// Brokers written in dynamically typed languages frequently emit numeric ids;
/// the bridge always stores them as strings.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            json_kind(&other)
        ))),
    }
}

/// Human-readable name of a JSON value's kind, used in error messages
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
