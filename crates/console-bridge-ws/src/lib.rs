//! WebSocket transport for the console bridge
//!
//! This crate provides a transport that implements the `Transport` trait from
//! `console-bridge-core`, exchanging envelopes with a broker as JSON text
//! frames over one WebSocket connection.

pub mod config;
pub mod error;
pub mod transport;

pub use config::{handshake_request, validate_url, WsConfig, PLATFORM_HEADER};
pub use error::WsTransportError;
pub use transport::WebSocketTransport;
