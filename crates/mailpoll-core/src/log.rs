//! Diagnostic sinks.
//!
//! A cycle writes its human-readable progress lines to a [`LogSink`] as it
//! goes. [`TracingSink`] forwards them to `tracing`; [`MemorySink`] keeps
//! them for inspection.

use std::sync::{Mutex, PoisonError};

/// Severity of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Progress.
    Info,
    /// Recoverable problem.
    Warn,
    /// The cycle failed.
    Error,
}

/// Receives diagnostic lines.
pub trait LogSink: Send + Sync {
    /// Records a line at `level`.
    fn log(&self, level: LogLevel, line: &str);

    /// Records a progress line.
    fn info(&self, line: &str) {
        self.log(LogLevel::Info, line);
    }

    /// Records a recoverable problem.
    fn warn(&self, line: &str) {
        self.log(LogLevel::Warn, line);
    }

    /// Records a failure.
    fn error(&self, line: &str) {
        self.log(LogLevel::Error, line);
    }
}

/// Forwards lines to `tracing` under the `mailpoll::cycle` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "mailpoll::cycle", "{line}"),
            LogLevel::Warn => tracing::warn!(target: "mailpoll::cycle", "{line}"),
            LogLevel::Error => tracing::error!(target: "mailpoll::cycle", "{line}"),
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded line with its level.
    #[must_use]
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, line)| line).collect()
    }

    /// Returns the lines recorded at `level`.
    #[must_use]
    pub fn lines_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line.to_string()));
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order_and_levels() {
        let sink = MemorySink::new();
        sink.info("a");
        sink.warn("b");
        sink.error("c");

        assert_eq!(sink.lines(), vec!["a", "b", "c"]);
        assert_eq!(sink.lines_at(LogLevel::Warn), vec!["b"]);
        assert_eq!(sink.entries()[2].0, LogLevel::Error);
    }
}
