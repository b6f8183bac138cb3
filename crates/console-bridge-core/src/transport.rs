//! Transport Handle Definition
//!
//! The broker connection is an opaque collaborator. The session controller
//! only needs to route it to an endpoint, hand it an inbound channel, spawn its
//! background loop, probe connectivity, and send envelopes through it.
//! Concrete implementations live in their own crates (`console-bridge-ws`), and
//! a deterministic double is available behind the `testing` feature.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::EndpointConfig;
use crate::envelope::Envelope;
use crate::errors::TransportError;

/// Capacity of the inbound delivery channel
pub const DEFAULT_INBOUND_BUFFER: usize = 256;

// ----------------------------------------------------------------------------
// Inbound Delivery
// ----------------------------------------------------------------------------

/// Transport side of the inbound channel; carries raw payloads
pub type InboundSender = mpsc::Sender<Value>;

/// Consumer side of the inbound channel, drained by exactly one task
pub type InboundReceiver = mpsc::Receiver<Value>;

/// Create a bounded inbound channel
pub fn create_inbound_channel(buffer: usize) -> (InboundSender, InboundReceiver) {
    mpsc::channel(buffer)
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Connection to a remote message broker
///
/// Methods take `&self` so one handle can be shared between the background
/// task spawned from [`Transport::run`] and the input loop calling
/// [`Transport::send`]. Implementations keep their mutable state behind
/// interior mutability.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Register the route to a broker endpoint
    ///
    /// Connectivity is not guaranteed on return; poll [`Transport::is_connected`].
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<(), TransportError>;

    /// Attach the inbound delivery channel
    ///
    /// Exactly one registration is accepted per transport; a second call fails
    /// with [`TransportError::HandlerAlreadyRegistered`].
    fn register_inbound(&self, sender: InboundSender) -> Result<(), TransportError>;

    /// Run the transport's background loop until the connection closes or the
    /// task is cancelled
    async fn run(&self) -> Result<(), TransportError>;

    /// Whether a live connection exists for `platform`
    fn is_connected(&self, platform: &str) -> bool;

    /// Send one envelope; fails with [`TransportError::NotConnected`] when
    /// there is no live connection. Never retries.
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;

    /// Close the connection
    async fn disconnect(&self) -> Result<(), TransportError>;
}
