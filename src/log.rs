//! Leveled log sinks for crawl narration.
//!
//! The crawler reports progress and absorbed errors as plain text lines
//! through a [`LogSink`], independent of where the lines end up.

use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::Level;

/// Default number of lines kept by [`LogHistory`]
pub const DEFAULT_HISTORY_LEN: usize = 150;

/// Destination for crawl progress and error lines
pub trait LogSink: Send + Sync {
    /// Record one line; never fails
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Forward lines to `tracing`
fn emit(level: Level, message: &str) {
    match level {
        Level::ERROR => tracing::error!(target: "slurp::crawl", "{}", message),
        Level::WARN => tracing::warn!(target: "slurp::crawl", "{}", message),
        Level::INFO => tracing::info!(target: "slurp::crawl", "{}", message),
        Level::DEBUG => tracing::debug!(target: "slurp::crawl", "{}", message),
        _ => tracing::trace!(target: "slurp::crawl", "{}", message),
    }
}

/// Sink that writes straight to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, level: Level, message: &str) {
        emit(level, message);
    }
}

/// One retained line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
}

/// Bounded newest-first history that also forwards to tracing
#[derive(Debug)]
pub struct LogHistory {
    capacity: usize,
    lines: Mutex<VecDeque<LogLine>>,
}

impl Default for LogHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}

impl LogHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Retained lines, newest first
    pub fn lines(&self) -> Vec<LogLine> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Retained messages, newest first
    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|line| line.message).collect()
    }

    /// True if any retained message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lines().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for LogHistory {
    fn log(&self, level: Level, message: &str) {
        emit(level, message);

        if self.capacity == 0 {
            return;
        }

        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push_front(LogLine {
            level,
            message: message.to_string(),
        });
        lines.truncate(self.capacity);
    }
}
