//! Session state shared between the controller and its loops

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Running Flag
// ----------------------------------------------------------------------------

/// Cooperative cancellation flag for the console input loop
///
/// Starts out running and can only be cleared. Once cleared it never returns
/// to running.
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the flag; returns true only for the call that actually cleared it
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Lifecycle Phase
// ----------------------------------------------------------------------------

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Stopped,
    Connecting,
    Running,
    Stopping,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Stopped => "stopped",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Running => "running",
            SessionPhase::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

// ----------------------------------------------------------------------------
// Session Statistics
// ----------------------------------------------------------------------------

/// Counters updated by the input loop and the inbound handler
#[derive(Debug, Default)]
pub struct SessionStats {
    sent: AtomicU64,
    send_failures: AtomicU64,
    received: AtomicU64,
    decode_failures: AtomicU64,
}

impl SessionStats {
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            sent: self.sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`SessionStats`] reported when a session ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub sent: u64,
    pub send_failures: u64,
    pub received: u64,
    pub decode_failures: u64,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sent, {} received, {} failed sends, {} undecodable",
            self.sent, self.received, self.send_failures, self.decode_failures
        )
    }
}
