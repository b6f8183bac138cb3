//! WebSocket transport task
//!
//! [`WebSocketTransport::run`] performs the opening handshake, then reads
//! frames until the server closes the connection or [`Transport::disconnect`]
//! is called. Envelopes travel as JSON text frames in both directions. There
//! is no reconnection: once the loop ends the transport stays disconnected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use console_bridge_core::{EndpointConfig, Envelope, InboundSender, Transport, TransportError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::{handshake_request, validate_url, WsConfig};
use crate::error::WsTransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the connected flag when the read loop ends or is cancelled
struct ConnectedGuard<'a>(&'a AtomicBool);

impl Drop for ConnectedGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ----------------------------------------------------------------------------
// WebSocket Transport
// ----------------------------------------------------------------------------

/// [`Transport`] over a single WebSocket connection
pub struct WebSocketTransport {
    config: WsConfig,
    endpoint: Mutex<Option<EndpointConfig>>,
    inbound: Mutex<Option<InboundSender>>,
    sink: AsyncMutex<Option<WsSink>>,
    connected: AtomicBool,
    started: AtomicBool,
    shutdown: Notify,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::with_config(WsConfig::default())
    }

    pub fn with_config(config: WsConfig) -> Self {
        Self {
            config,
            endpoint: Mutex::new(None),
            inbound: Mutex::new(None),
            sink: AsyncMutex::new(None),
            connected: AtomicBool::new(false),
            started: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    fn current_endpoint(&self) -> Option<EndpointConfig> {
        lock(&self.endpoint).clone()
    }

    async fn open(&self, endpoint: &EndpointConfig) -> Result<WsSource, WsTransportError> {
        let request = handshake_request(endpoint)?;
        let handshake = tokio::time::timeout(self.config.handshake_timeout, connect_async(request));
        let (stream, response) = match handshake.await {
            Ok(Ok(connected)) => connected,
            Ok(Err(source)) => {
                return Err(WsTransportError::Handshake {
                    url: endpoint.url.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(WsTransportError::Handshake {
                    url: endpoint.url.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "opening handshake timed out",
                    )
                    .into(),
                })
            }
        };
        debug!("Handshake completed with status {}", response.status());

        let (sink, source) = stream.split();
        *self.sink.lock().await = Some(sink);
        Ok(source)
    }

    async fn read_loop(&self, source: &mut WsSource) -> Result<(), WsTransportError> {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    debug!("Read loop stopped by disconnect");
                    return Ok(());
                }
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.deliver(&text).await,
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => self.deliver(text).await,
                        Err(_) => warn!("Dropping non UTF-8 binary frame ({} bytes)", bytes.len()),
                    },
                    // tungstenite queues the pong reply itself
                    Some(Ok(Message::Ping(_))) => debug!("Ping received"),
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        info!("Server closed the connection: {:?}", frame);
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        info!("Connection closed");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn deliver(&self, text: &str) {
        let payload: Value = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{}", WsTransportError::InvalidFrame(e));
                return;
            }
        };

        let sender = lock(&self.inbound).clone();
        match sender {
            Some(sender) => {
                if sender.send(payload).await.is_err() {
                    debug!("Inbound channel closed; dropping message");
                }
            }
            None => warn!("No inbound handler registered; dropping message"),
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<(), TransportError> {
        validate_url(&endpoint.url)?;
        debug!("Route registered: {} -> {}", endpoint.platform, endpoint.url);
        *lock(&self.endpoint) = Some(endpoint.clone());
        Ok(())
    }

    fn register_inbound(&self, sender: InboundSender) -> Result<(), TransportError> {
        let mut slot = lock(&self.inbound);
        if slot.is_some() {
            return Err(TransportError::HandlerAlreadyRegistered);
        }
        *slot = Some(sender);
        Ok(())
    }

    async fn run(&self) -> Result<(), TransportError> {
        let endpoint = self.current_endpoint().ok_or(TransportError::NoEndpoint)?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WsTransportError::AlreadyRunning.into());
        }

        let mut source = match self.open(&endpoint).await {
            Ok(source) => source,
            Err(e) => {
                error!("Connection to {} failed: {}", endpoint.url, e);
                return Err(e.into());
            }
        };

        let connected = ConnectedGuard(&self.connected);
        self.connected.store(true, Ordering::SeqCst);
        info!("WebSocket connected to {}", endpoint.url);

        let result = self.read_loop(&mut source).await;
        drop(connected);
        self.sink.lock().await.take();
        result.map_err(Into::into)
    }

    fn is_connected(&self, platform: &str) -> bool {
        self.connected.load(Ordering::SeqCst)
            && lock(&self.endpoint)
                .as_ref()
                .is_some_and(|endpoint| endpoint.platform == platform)
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let not_connected = || TransportError::NotConnected {
            platform: envelope.info.platform.clone(),
        };
        if !self.connected.load(Ordering::SeqCst) {
            return Err(not_connected());
        }

        let frame = envelope.encode_text()?;
        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or_else(not_connected)?;
        sink.send(Message::Text(frame))
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })?;
        debug!("Sent envelope {}", envelope.info.message_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("Close frame not sent: {}", e);
            }
        }
        self.shutdown.notify_one();
        Ok(())
    }
}
