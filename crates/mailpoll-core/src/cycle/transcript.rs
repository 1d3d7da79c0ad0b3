//! Diagnostics collected during one cycle.

use crate::log::{LogLevel, LogSink};

/// Ordered diagnostic lines, mirrored to a sink as they are added.
pub(crate) struct Transcript<'a> {
    sink: &'a dyn LogSink,
    lines: Vec<String>,
}

impl<'a> Transcript<'a> {
    pub(crate) fn new(sink: &'a dyn LogSink) -> Self {
        Self {
            sink,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, level: LogLevel, line: String) {
        self.sink.log(level, &line);
        self.lines.push(line);
    }

    pub(crate) fn info(&mut self, line: impl Into<String>) {
        self.push(LogLevel::Info, line.into());
    }

    pub(crate) fn warn(&mut self, line: impl Into<String>) {
        self.push(LogLevel::Warn, line.into());
    }

    pub(crate) fn error(&mut self, line: impl Into<String>) {
        self.push(LogLevel::Error, line.into());
    }

    /// Logs without recording.
    pub(crate) fn log_only(&self, level: LogLevel, line: &str) {
        self.sink.log(level, line);
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
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
    use crate::log::MemorySink;

    #[test]
    fn mirrors_to_sink() {
        let sink = MemorySink::new();
        let mut transcript = Transcript::new(&sink);
        transcript.info("one");
        transcript.log_only(LogLevel::Error, "hidden");
        transcript.warn("two");

        assert_eq!(transcript.into_lines(), vec!["one", "two"]);
        assert_eq!(sink.lines(), vec!["one", "hidden", "two"]);
    }
}
