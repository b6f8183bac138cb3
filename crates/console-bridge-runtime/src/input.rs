//! Console input loop
//!
//! Lines come from a [`LineSource`]. The stdin source reads on a dedicated OS
//! thread and forwards each line through a channel, so a blocked read never
//! stalls the async runtime.

use std::io::{self, BufRead};
use std::sync::Arc;

use console_bridge_core::{BridgeError, OutboundBuilder, Transport};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::console::Console;
use crate::state::{RunFlag, SessionStats};

/// Keywords that end the session, matched case-insensitively against the whole line
pub const EXIT_KEYWORDS: [&str; 2] = ["exit", "quit"];

// ----------------------------------------------------------------------------
// Line Sources
// ----------------------------------------------------------------------------

/// Result of one read from a line source
#[derive(Debug)]
pub enum InputEvent {
    /// A complete line without its terminator
    Line(String),
    EndOfInput,
    Interrupted,
    /// The source failed and cannot produce more lines
    Failed(io::Error),
}

/// Producer of operator input lines
#[async_trait::async_trait]
pub trait LineSource: Send {
    async fn next_event(&mut self) -> InputEvent;
}

/// [`LineSource`] backed by a blocking reader on its own thread
#[derive(Debug)]
pub struct StdinLineSource {
    events: mpsc::Receiver<InputEvent>,
}

impl StdinLineSource {
    /// Start reading the process's stdin
    pub fn spawn() -> io::Result<Self> {
        // The stdin lock is not Send, so it is taken on the reader thread
        Self::start(|tx| read_lines(io::stdin().lock(), tx))
    }

    /// Start reading an arbitrary blocking reader
    pub fn from_reader<R>(reader: R) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        Self::start(move |tx| read_lines(reader, tx))
    }

    fn start<F>(reader: F) -> io::Result<Self>
    where
        F: FnOnce(mpsc::Sender<InputEvent>) + Send + 'static,
    {
        // One line of read-ahead at most
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || reader(tx))?;
        Ok(Self { events: rx })
    }
}

#[async_trait::async_trait]
impl LineSource for StdinLineSource {
    async fn next_event(&mut self) -> InputEvent {
        self.events.recv().await.unwrap_or(InputEvent::EndOfInput)
    }
}

fn read_lines<R: BufRead>(mut reader: R, tx: mpsc::Sender<InputEvent>) {
    loop {
        let mut line = String::new();
        let event = match reader.read_line(&mut line) {
            Ok(0) => InputEvent::EndOfInput,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                InputEvent::Line(line)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => InputEvent::Interrupted,
            Err(e) => InputEvent::Failed(e),
        };

        let terminal = !matches!(event, InputEvent::Line(_));
        // Receiver gone means the session is over
        if tx.blocking_send(event).is_err() || terminal {
            return;
        }
    }
}

// ----------------------------------------------------------------------------
// Scripted Line Source
// ----------------------------------------------------------------------------

#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedLineSource;

#[cfg(any(test, feature = "testing"))]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{InputEvent, LineSource};

    /// [`LineSource`] replaying a fixed script
    ///
    /// Once the script is exhausted it reports end of input, or waits forever
    /// when built with [`ScriptedLineSource::then_wait`].
    #[derive(Debug)]
    pub struct ScriptedLineSource {
        script: VecDeque<InputEvent>,
        wait_when_empty: bool,
        reads: Arc<AtomicUsize>,
    }

    impl ScriptedLineSource {
        pub fn lines<I, S>(lines: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::events(lines.into_iter().map(|l| InputEvent::Line(l.into())))
        }

        pub fn events<I>(events: I) -> Self
        where
            I: IntoIterator<Item = InputEvent>,
        {
            Self {
                script: events.into_iter().collect(),
                wait_when_empty: false,
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Block instead of reporting end of input once the script runs out
        pub fn then_wait(mut self) -> Self {
            self.wait_when_empty = true;
            self
        }

        /// Shared counter of reads, usable after the source has been moved
        pub fn read_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.reads)
        }
    }

    #[async_trait::async_trait]
    impl LineSource for ScriptedLineSource {
        async fn next_event(&mut self) -> InputEvent {
            self.reads.fetch_add(1, Ordering::SeqCst);
            match self.script.pop_front() {
                Some(event) => event,
                None if self.wait_when_empty => std::future::pending().await,
                None => InputEvent::EndOfInput,
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Input Loop
// ----------------------------------------------------------------------------

/// Why the input loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    ExitRequested,
    EndOfInput,
    Interrupted,
    /// The running flag was cleared by someone else
    Stopped,
}

enum LineAction<'a> {
    Exit,
    Skip,
    Send(&'a str),
}

/// Exit keywords must match the whole line; padded keywords are sent as text
fn classify(line: &str) -> LineAction<'_> {
    if line.trim().is_empty() {
        LineAction::Skip
    } else if EXIT_KEYWORDS
        .iter()
        .any(|keyword| line.eq_ignore_ascii_case(keyword))
    {
        LineAction::Exit
    } else {
        LineAction::Send(line)
    }
}

/// Reads operator lines and submits them to the transport
pub struct ConsoleInputLoop {
    transport: Arc<dyn Transport>,
    source: Box<dyn LineSource>,
    console: Arc<dyn Console>,
    builder: OutboundBuilder,
    running: RunFlag,
    stats: Arc<SessionStats>,
}

impl ConsoleInputLoop {
    pub fn new(
        transport: Arc<dyn Transport>,
        source: Box<dyn LineSource>,
        console: Arc<dyn Console>,
        builder: OutboundBuilder,
        running: RunFlag,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            transport,
            source,
            console,
            builder,
            running,
            stats,
        }
    }

    /// Run until an exit keyword, end of input, or the running flag is cleared
    ///
    /// Only an unrecoverable source failure is returned as an error; the flag
    /// is cleared on every exit path.
    pub async fn run(mut self) -> Result<InputOutcome, BridgeError> {
        while self.running.is_running() {
            let event = self.source.next_event().await;
            if !self.running.is_running() {
                debug!("Session stopped while waiting for input; discarding it");
                return Ok(InputOutcome::Stopped);
            }

            match event {
                InputEvent::Line(line) => match classify(&line) {
                    LineAction::Exit => {
                        info!("Exit requested");
                        self.running.stop();
                        return Ok(InputOutcome::ExitRequested);
                    }
                    LineAction::Skip => self.console.show_prompt(),
                    LineAction::Send(text) => {
                        submit(self.transport.as_ref(), &self.builder, &self.stats, text).await;
                        self.console.show_prompt();
                    }
                },
                InputEvent::EndOfInput => {
                    info!("End of input");
                    self.running.stop();
                    return Ok(InputOutcome::EndOfInput);
                }
                InputEvent::Interrupted => {
                    info!("Input interrupted");
                    self.running.stop();
                    return Ok(InputOutcome::Interrupted);
                }
                InputEvent::Failed(e) => {
                    self.running.stop();
                    return Err(BridgeError::Input(e));
                }
            }
        }
        Ok(InputOutcome::Stopped)
    }
}

async fn submit(
    transport: &dyn Transport,
    builder: &OutboundBuilder,
    stats: &SessionStats,
    text: &str,
) {
    let envelope = builder.build(text);
    match transport.send(&envelope).await {
        Ok(()) => {
            stats.record_sent();
            info!("Message sent ({})", envelope.info.message_id);
        }
        Err(e) => {
            stats.record_send_failure();
            warn!("Failed to send message: {}", e);
        }
    }
}
