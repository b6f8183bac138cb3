//! Inbound message handling
//!
//! Drains the transport's inbound channel one payload at a time, decodes each
//! payload, and renders the result without corrupting the operator's prompt.

use std::future::Future;
use std::sync::Arc;

use console_bridge_core::{decode_inbound, DecodeError, Envelope, InboundReceiver};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::console::Console;
use crate::state::SessionStats;

/// What an inbound envelope renders to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Lines(Vec<String>),
    /// The envelope carried no content
    Empty,
}

/// Printed in place of a reply that carried no content
pub const NO_CONTENT_NOTICE: &str = "  (message had no content)";

/// Render one leaf as `  [type]: data`
pub fn render_leaf(kind: &str, data: &Value) -> String {
    match data {
        Value::String(text) => format!("  [{}]: {}", kind, text),
        other => format!("  [{}]: {}", kind, other),
    }
}

/// Render an envelope body
///
/// A `seglist` renders each leaf on its own line, nested lists flattened in
/// depth-first order. A single leaf renders directly.
pub fn render(envelope: &Envelope) -> Rendered {
    let lines: Vec<String> = match &envelope.body {
        None => return Rendered::Empty,
        Some(body) => body
            .leaves()
            .into_iter()
            .map(|(kind, data)| render_leaf(kind, data))
            .collect(),
    };

    if lines.is_empty() {
        Rendered::Empty
    } else {
        Rendered::Lines(lines)
    }
}

// ----------------------------------------------------------------------------
// Inbound Handler
// ----------------------------------------------------------------------------

/// Decodes and renders inbound payloads
pub struct InboundHandler {
    console: Arc<dyn Console>,
    stats: Arc<SessionStats>,
}

impl InboundHandler {
    pub fn new(console: Arc<dyn Console>, stats: Arc<SessionStats>) -> Self {
        Self { console, stats }
    }

    /// Handle one raw payload
    ///
    /// The prompt line is cleared first and re-issued last, whatever the
    /// outcome. Decode errors are logged and returned; they never end the session.
    pub fn handle(&self, raw: &Value) -> Result<(), DecodeError> {
        self.console.clear_line();
        debug!("Raw inbound payload:\n{:#}", raw);

        let result = decode_inbound(raw);
        match &result {
            Ok(envelope) => {
                self.stats.record_received();
                self.display(envelope);
            }
            Err(e) => {
                self.stats.record_decode_failure();
                error!("Failed to decode inbound message: {}", e);
            }
        }

        self.console.show_prompt();
        result.map(|_| ())
    }

    fn display(&self, envelope: &Envelope) {
        debug!("Decoded inbound envelope: {:#?}", envelope);
        info!(
            "Reply from {} ({})",
            envelope.info.sender.nickname, envelope.info.sender.user_id
        );

        match render(envelope) {
            Rendered::Lines(lines) => {
                for line in lines {
                    self.console.print_line(&line);
                }
            }
            Rendered::Empty => {
                warn!(
                    "Message {} had no content segment",
                    envelope.info.message_id
                );
                self.console.print_line(NO_CONTENT_NOTICE);
            }
        }
    }

    /// Drain the inbound channel until every sender is dropped
    pub async fn run(self, inbound: InboundReceiver) {
        self.run_until(inbound, std::future::pending()).await;
    }

    /// Like [`run`](Self::run), but once `stop` resolves the channel is
    /// closed and only the payloads already queued are handled
    pub async fn run_until<F>(self, mut inbound: InboundReceiver, stop: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        loop {
            tokio::select! {
                raw = inbound.recv() => match raw {
                    // Already logged; keep draining
                    Some(raw) => { let _ = self.handle(&raw); }
                    None => break,
                },
                _ = &mut stop => {
                    inbound.close();
                    while let Some(raw) = inbound.recv().await {
                        let _ = self.handle(&raw);
                    }
                    break;
                }
            }
        }
        debug!("Inbound channel closed");
    }
}
