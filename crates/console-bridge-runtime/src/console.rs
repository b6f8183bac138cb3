//! Console output and prompt handling
//!
//! Inbound messages can arrive while the operator is typing. Every writer goes
//! through [`Console`], which clears the half-drawn prompt line before printing
//! and redraws the prompt afterwards.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

/// Prompt shown while waiting for operator input
pub const DEFAULT_PROMPT: &str = "Enter message (or 'exit' to quit): ";

/// Line-oriented interactive console
pub trait Console: Send + Sync {
    /// Issue the input prompt without a trailing newline
    fn show_prompt(&self);

    /// Clear the current line, discarding a partially drawn prompt
    fn clear_line(&self);

    /// Print one full line of output
    fn print_line(&self, line: &str);
}

// ----------------------------------------------------------------------------
// Terminal Console
// ----------------------------------------------------------------------------

/// [`Console`] writing to the process's stdout
#[derive(Debug, Clone)]
pub struct TerminalConsole {
    prompt: String,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self::with_prompt(DEFAULT_PROMPT)
    }

    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    fn write_with<F>(&self, op: &str, f: F)
    where
        F: FnOnce(&mut io::StdoutLock<'static>) -> io::Result<()>,
    {
        let mut out = io::stdout().lock();
        if let Err(e) = f(&mut out).and_then(|_| out.flush()) {
            tracing::debug!("Console {} failed: {}", op, e);
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn show_prompt(&self) {
        self.write_with("prompt", |out| queue!(out, Print(&self.prompt)));
    }

    fn clear_line(&self) {
        self.write_with("clear", |out| {
            queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))
        });
    }

    fn print_line(&self, line: &str) {
        self.write_with("print", |out| queue!(out, Print(line), Print("\n")));
    }
}

// ----------------------------------------------------------------------------
// Recording Console
// ----------------------------------------------------------------------------

#[cfg(any(test, feature = "testing"))]
pub use recording::{ConsoleEvent, RecordingConsole};

#[cfg(any(test, feature = "testing"))]
mod recording {
    use std::sync::{Mutex, MutexGuard};

    use super::Console;

    /// Something written to a [`RecordingConsole`]
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConsoleEvent {
        Prompt,
        Clear,
        Line(String),
    }

    /// [`Console`] that records every call for later assertions
    #[derive(Debug, Default)]
    pub struct RecordingConsole {
        events: Mutex<Vec<ConsoleEvent>>,
    }

    impl RecordingConsole {
        pub fn new() -> Self {
            Self::default()
        }

        fn events_mut(&self) -> MutexGuard<'_, Vec<ConsoleEvent>> {
            self.events
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
        }

        pub fn events(&self) -> Vec<ConsoleEvent> {
            self.events_mut().clone()
        }

        pub fn prompts(&self) -> usize {
            self.events_mut()
                .iter()
                .filter(|event| **event == ConsoleEvent::Prompt)
                .count()
        }

        pub fn lines(&self) -> Vec<String> {
            self.events_mut()
                .iter()
                .filter_map(|event| match event {
                    ConsoleEvent::Line(line) => Some(line.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Console for RecordingConsole {
        fn show_prompt(&self) {
            self.events_mut().push(ConsoleEvent::Prompt);
        }

        fn clear_line(&self) {
            self.events_mut().push(ConsoleEvent::Clear);
        }

        fn print_line(&self, line: &str) {
            self.events_mut().push(ConsoleEvent::Line(line.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_console_tracks_prompts_and_lines() {
        let console = RecordingConsole::new();
        console.show_prompt();
        console.clear_line();
        console.print_line("  [text]: hi");
        console.show_prompt();

        assert_eq!(console.prompts(), 2);
        assert_eq!(console.lines(), vec!["  [text]: hi"]);
        assert_eq!(console.events()[1], ConsoleEvent::Clear);
    }

    #[test]
    fn test_terminal_console_default_prompt() {
        let console = TerminalConsole::default();
        assert_eq!(console.prompt, DEFAULT_PROMPT);
    }
}
