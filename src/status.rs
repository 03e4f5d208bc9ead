// Operator-facing status lines
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fmt;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Warn => "WARN",
            StatusLevel::Error => "ERRO",
        };
        f.write_str(prefix)
    }
}

/// Receives the human-readable progress of an operation
pub trait StatusSink {
    fn status(&mut self, level: StatusLevel, message: &str);

    fn info(&mut self, message: &str) {
        self.status(StatusLevel::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.status(StatusLevel::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.status(StatusLevel::Error, message);
    }
}

/// Prints status lines to the terminal, errors and warnings on stderr
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn status(&mut self, level: StatusLevel, message: &str) {
        debug!(%level, "{}", message);
        for line in message.lines() {
            match level {
                StatusLevel::Info => println!("{}: {}", level, line),
                StatusLevel::Warn | StatusLevel::Error => eprintln!("{}: {}", level, line),
            }
        }
    }
}

/// Keeps every status line in memory
#[derive(Debug, Default)]
pub struct StatusLog {
    pub lines: Vec<(StatusLevel, String)>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, level: StatusLevel, needle: &str) -> bool {
        self.lines
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }

    pub fn count(&self, level: StatusLevel) -> usize {
        self.lines.iter().filter(|(l, _)| *l == level).count()
    }
}

impl StatusSink for StatusLog {
    fn status(&mut self, level: StatusLevel, message: &str) {
        self.lines.push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_log_records_levels() {
        let mut log = StatusLog::new();
        log.info("Refreshing memory values.");
        log.warn("careful");
        log.error("Failed to update swap space.");

        assert_eq!(log.lines.len(), 3);
        assert_eq!(log.count(StatusLevel::Error), 1);
        assert!(log.contains(StatusLevel::Info, "Refreshing"));
        assert!(!log.contains(StatusLevel::Warn, "Refreshing"));
    }

    #[test]
    fn test_level_prefixes() {
        assert_eq!(StatusLevel::Info.to_string(), "INFO");
        assert_eq!(StatusLevel::Warn.to_string(), "WARN");
        assert_eq!(StatusLevel::Error.to_string(), "ERRO");
    }
}
