//! Message id and timestamp generation
//!
//! Ids keep the broker-friendly `console_msg_<seconds>` wall-clock scheme and
//! append a per-process sequence number, so two envelopes built within the
//! same clock tick still get distinct ids. Timestamps never go backwards for a
//! given stamper even if the wall clock does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix shared by every outbound message id
pub const MESSAGE_ID_PREFIX: &str = "console_msg";

const MICROS_PER_SEC: u64 = 1_000_000;

/// Time and id assigned to one outbound envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    pub message_id: String,
    /// Seconds since the Unix epoch, microsecond precision
    pub timestamp: f64,
}

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

/// Issues [`Stamp`]s for outbound envelopes
pub struct MessageStamper {
    clock: Clock,
    last_micros: AtomicU64,
    sequence: AtomicU64,
}

impl MessageStamper {
    /// Stamper backed by the system wall clock
    pub fn new() -> Self {
        Self::with_clock(wall_clock_micros)
    }

    /// Stamper backed by a custom microsecond clock
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        Self {
            clock: Box::new(clock),
            last_micros: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Issue the next stamp
    pub fn issue(&self) -> Stamp {
        let now = (self.clock)();
        let previous = self.last_micros.fetch_max(now, Ordering::SeqCst);
        let micros = previous.max(now);
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);

        Stamp {
            message_id: format!(
                "{}_{}.{:06}_{}",
                MESSAGE_ID_PREFIX,
                micros / MICROS_PER_SEC,
                micros % MICROS_PER_SEC,
                seq
            ),
            timestamp: micros as f64 / MICROS_PER_SEC as f64,
        }
    }

    /// Number of stamps issued so far
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for MessageStamper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageStamper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStamper")
            .field("last_micros", &self.last_micros.load(Ordering::Relaxed))
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish()
    }
}

fn wall_clock_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
