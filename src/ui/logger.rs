//! Logging capability injected into commands
//!
//! Commands report through a [`Logger`] instead of printing directly, so
//! callers decide where status lines and warnings go.

use super::context::UiContext;
use super::output;
use std::sync::Mutex;
use tracing::debug;

/// Sink for user-facing status lines and warnings
pub trait Logger: Send + Sync {
    /// A status line
    fn info(&self, message: &str);

    /// A non-fatal warning
    fn warn(&self, message: &str);
}

/// Logger that writes to the terminal
///
/// Lines are mirrored to `tracing` at debug level only, so the terminal
/// shows each of them once unless debug logging is on.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleLogger {
    ctx: UiContext,
}

impl ConsoleLogger {
    /// Create a logger rendering for the given context
    pub fn new(ctx: UiContext) -> Self {
        Self { ctx }
    }
}

impl Logger for ConsoleLogger {
    fn info(&self, message: &str) {
        debug!("{}", message);
        output::success(&self.ctx, message);
    }

    fn warn(&self, message: &str) {
        debug!("warning: {}", message);
        output::warn(&self.ctx, message);
    }
}

/// A recorded log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Info(String),
    Warn(String),
}

/// Logger that keeps every line in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far, in order
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Only the info lines
    pub fn infos(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|l| match l {
                LogLine::Info(m) => Some(m),
                LogLine::Warn(_) => None,
            })
            .collect()
    }

    /// Only the warnings
    pub fn warnings(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|l| match l {
                LogLine::Warn(m) => Some(m),
                LogLine::Info(_) => None,
            })
            .collect()
    }

    fn push(&self, line: LogLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl Logger for MemoryLogger {
    fn info(&self, message: &str) {
        self.push(LogLine::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.push(LogLine::Warn(message.to_string()));
    }
}
