//! Error types for the WebSocket transport

use console_bridge_core::{BridgeError, TransportError};
use thiserror::Error;
use tokio_tungstenite::tungstenite;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the WebSocket transport
#[derive(Error, Debug)]
pub enum WsTransportError {
    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid value for handshake header {name}")]
    InvalidHeader { name: &'static str },

    #[error("WebSocket handshake with {url} failed: {source}")]
    Handshake {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("WebSocket error: {0}")]
    Socket(#[from] tungstenite::Error),

    #[error("Inbound frame is not valid JSON: {0}")]
    InvalidFrame(#[from] serde_json::Error),

    #[error("Transport loop already started")]
    AlreadyRunning,
}

impl From<WsTransportError> for TransportError {
    fn from(err: WsTransportError) -> Self {
        match err {
            WsTransportError::InvalidUrl { .. } | WsTransportError::InvalidHeader { .. } => {
                TransportError::InvalidConfiguration {
                    reason: err.to_string(),
                }
            }
            WsTransportError::Handshake { ref url, .. } => TransportError::ConnectionFailed {
                endpoint: url.clone(),
                reason: err.to_string(),
            },
            WsTransportError::AlreadyRunning => TransportError::InvalidConfiguration {
                reason: err.to_string(),
            },
            WsTransportError::Socket(_) | WsTransportError::InvalidFrame(_) => {
                TransportError::ReceiveFailed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

impl From<WsTransportError> for BridgeError {
    fn from(err: WsTransportError) -> Self {
        BridgeError::Transport(err.into())
    }
}
