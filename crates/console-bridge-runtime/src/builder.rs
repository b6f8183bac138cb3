//! Session Builder API
//!
//! Builder-style setup for a [`SessionController`]: callers (the CLI, tests)
//! plug in a transport and optionally a console, a line source, and an
//! interrupt signal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use console_bridge_core::{BridgeError, SessionConfig, Transport, DEFAULT_INBOUND_BUFFER};
use tracing::debug;

use crate::console::{Console, TerminalConsole};
use crate::input::{LineSource, StdinLineSource};
use crate::session::{InterruptSignal, SessionController};

/// Time the transport gets to wind down after `disconnect` before it is cancelled
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ----------------------------------------------------------------------------
// Session Builder
// ----------------------------------------------------------------------------

/// Builder for a [`SessionController`]
pub struct SessionBuilder {
    config: SessionConfig,
    transport: Option<Arc<dyn Transport>>,
    console: Option<Arc<dyn Console>>,
    source: Option<Box<dyn LineSource>>,
    interrupt: Option<InterruptSignal>,
    inbound_buffer: usize,
    shutdown_grace: Duration,
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            transport: None,
            console: None,
            source: None,
            interrupt: None,
            inbound_buffer: DEFAULT_INBOUND_BUFFER,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Set the broker transport (required)
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the console; defaults to [`TerminalConsole`]
    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = Some(console);
        self
    }

    /// Set the line source; defaults to [`StdinLineSource`]
    pub fn with_line_source(mut self, source: impl LineSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Stop the session gracefully when `signal` resolves
    pub fn with_interrupt<F>(mut self, signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.interrupt = Some(Box::pin(signal));
        self
    }

    /// Set the inbound channel capacity
    pub fn inbound_buffer(mut self, capacity: usize) -> Self {
        self.inbound_buffer = capacity.max(1);
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Validate the configuration and build the controller
    pub fn build(self) -> Result<SessionController, BridgeError> {
        self.config.validate()?;

        let transport = self
            .transport
            .ok_or_else(|| BridgeError::config_error("No transport configured for the session"))?;
        let console = self
            .console
            .unwrap_or_else(|| Arc::new(TerminalConsole::new()));
        let source = match self.source {
            Some(source) => source,
            None => {
                debug!("Using stdin as the line source");
                Box::new(StdinLineSource::spawn().map_err(BridgeError::Input)?)
            }
        };
        let interrupt = self
            .interrupt
            .unwrap_or_else(|| Box::pin(std::future::pending()));

        Ok(SessionController::new(
            self.config,
            transport,
            console,
            source,
            interrupt,
            self.inbound_buffer,
            self.shutdown_grace,
        ))
    }
}
