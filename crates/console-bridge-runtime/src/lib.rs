//! Console Bridge Runtime
//!
//! This crate contains the session engine of the console bridge:
//! - `SessionController`: the lifecycle state machine and its bounded connect wait
//! - `InboundHandler`: decodes and renders broker messages
//! - `ConsoleInputLoop`: turns operator lines into outbound envelopes
//!
//! Transports are plugged in through `console_bridge_core::Transport`.

pub mod builder;
pub mod console;
pub mod inbound;
pub mod input;
pub mod session;
pub mod state;

pub use builder::{SessionBuilder, DEFAULT_SHUTDOWN_GRACE};
pub use console::{Console, TerminalConsole, DEFAULT_PROMPT};
pub use inbound::{render, InboundHandler, Rendered, NO_CONTENT_NOTICE};
pub use input::{ConsoleInputLoop, InputEvent, InputOutcome, LineSource, StdinLineSource};
pub use session::{InterruptSignal, SessionController};
pub use state::{RunFlag, SessionPhase, SessionStats, SessionSummary};

#[cfg(any(test, feature = "testing"))]
pub use console::{ConsoleEvent, RecordingConsole};
#[cfg(any(test, feature = "testing"))]
pub use input::ScriptedLineSource;

// Re-export core types for convenience
pub use console_bridge_core::{BridgeError, Envelope, SessionConfig, Transport};
