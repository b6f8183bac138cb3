//! Deterministic transport double
//!
//! [`MockTransport`] records every call made through the [`Transport`] trait,
//! reports connectivity after a configurable number of probes, and lets tests
//! push raw inbound payloads as if they had arrived from a broker.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::Notify;

use crate::config::EndpointConfig;
use crate::envelope::Envelope;
use crate::errors::TransportError;
use crate::transport::{InboundSender, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory [`Transport`] for tests
#[derive(Debug)]
pub struct MockTransport {
    /// Probe count after which the transport reports connectivity
    connect_after: Option<u32>,
    probes: AtomicU32,
    connected: AtomicBool,
    fail_sends: AtomicBool,
    endpoint: Mutex<Option<EndpointConfig>>,
    inbound: Mutex<Option<InboundSender>>,
    sent: Mutex<Vec<Envelope>>,
    runs: AtomicU32,
    disconnects: AtomicU32,
    shutdown: Notify,
}

impl MockTransport {
    /// Transport that is connected on the first probe
    pub fn connected() -> Self {
        Self::connecting_after(1)
    }

    /// Transport that reports connectivity on the `probes`-th probe
    pub fn connecting_after(probes: u32) -> Self {
        Self::build(Some(probes))
    }

    /// Transport that never becomes connected
    pub fn unreachable() -> Self {
        Self::build(None)
    }

    fn build(connect_after: Option<u32>) -> Self {
        Self {
            connect_after,
            probes: AtomicU32::new(0),
            connected: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            endpoint: Mutex::new(None),
            inbound: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            runs: AtomicU32::new(0),
            disconnects: AtomicU32::new(0),
            shutdown: Notify::new(),
        }
    }

    /// Make subsequent sends fail with [`TransportError::SendFailed`]
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Deliver a raw payload to the registered inbound channel
    pub async fn inject(&self, payload: Value) -> Result<(), TransportError> {
        let sender = lock(&self.inbound)
            .clone()
            .ok_or_else(|| TransportError::ReceiveFailed {
                reason: "no inbound handler registered".to_string(),
            })?;
        sender
            .send(payload)
            .await
            .map_err(|_| TransportError::Shutdown {
                reason: "inbound channel closed".to_string(),
            })
    }

    pub fn sent(&self) -> Vec<Envelope> {
        lock(&self.sent).clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter_map(|envelope| envelope.body.as_ref())
            .flat_map(|body| {
                body.leaves()
                    .into_iter()
                    .filter_map(|(_, data)| data.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> Option<EndpointConfig> {
        lock(&self.endpoint).clone()
    }

    pub fn has_inbound(&self) -> bool {
        lock(&self.inbound).is_some()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self, endpoint: &EndpointConfig) -> Result<(), TransportError> {
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
        if lock(&self.endpoint).is_none() {
            return Err(TransportError::NoEndpoint);
        }
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.shutdown.notified().await;
        Ok(())
    }

    fn is_connected(&self, platform: &str) -> bool {
        let platform_matches = lock(&self.endpoint)
            .as_ref()
            .is_some_and(|endpoint| endpoint.platform == platform);
        if !platform_matches {
            return false;
        }

        let probe = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.connect_after.is_some_and(|after| probe >= after) {
            self.connected.store(true, Ordering::SeqCst);
        }
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected {
                platform: envelope.info.platform.clone(),
            });
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                reason: "send failure injected".to_string(),
            });
        }
        lock(&self.sent).push(envelope.clone());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.shutdown.notify_one();
        Ok(())
    }
}
