//! Error types for the console bridge
//!
//! This module contains the error taxonomy shared by every crate in the
//! workspace: decode failures for inbound payloads, transport failures, and
//! the `BridgeError` type that unifies them with the fatal session errors.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures while turning a raw inbound payload into an [`Envelope`](crate::Envelope)
///
/// Decode errors are never fatal to a session: the inbound handler logs them
/// and moves on to the next message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Inbound payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Inbound payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
    #[error("Malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Transport-level failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Not connected to platform {platform}")]
    NotConnected { platform: String },
    #[error("Connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },
    #[error("Send failed: {reason}")]
    SendFailed { reason: String },
    #[error("Receive failed: {reason}")]
    ReceiveFailed { reason: String },
    #[error("Inbound handler already registered")]
    HandlerAlreadyRegistered,
    #[error("No endpoint configured; call connect() before run()")]
    NoEndpoint,
    #[error("Invalid transport configuration: {reason}")]
    InvalidConfiguration { reason: String },
    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Transport shutdown: {reason}")]
    Shutdown { reason: String },
}

// ----------------------------------------------------------------------------
// Bridge Error
// ----------------------------------------------------------------------------

/// Core error type for a console bridge session
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The connection poll budget ran out before the transport reported connectivity
    #[error("Could not connect to {endpoint} after {attempts} attempts ({waited:?})")]
    ConnectionTimeout {
        endpoint: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The console line source failed in a way that cannot be recovered
    #[error("Console input failed: {0}")]
    Input(#[source] std::io::Error),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

impl BridgeError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        BridgeError::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether this error ends the whole session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectionTimeout { .. }
                | BridgeError::Input(_)
                | BridgeError::Configuration { .. }
        )
    }
}

/// Result type for console bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let timeout = BridgeError::ConnectionTimeout {
            endpoint: "ws://127.0.0.1:8000/ws".to_string(),
            attempts: 10,
            waited: Duration::from_secs(10),
        };
        assert!(timeout.is_fatal());

        let transport = BridgeError::from(TransportError::NotConnected {
            platform: "console_adapter".to_string(),
        });
        assert!(!transport.is_fatal());

        let decode = BridgeError::from(DecodeError::NotAnObject { found: "array" });
        assert!(!decode.is_fatal());
    }

    #[test]
    fn test_timeout_message_names_endpoint() {
        let err = BridgeError::ConnectionTimeout {
            endpoint: "ws://broker/ws".to_string(),
            attempts: 3,
            waited: Duration::from_secs(3),
        };
        let text = err.to_string();
        assert!(text.contains("ws://broker/ws"));
        assert!(text.contains("3 attempts"));
    }
}
