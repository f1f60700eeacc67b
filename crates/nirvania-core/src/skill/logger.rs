//! Per-run execution logger.
//!
//! An append-only, timestamped, leveled buffer scoped to a single run. Every
//! entry is mirrored to `tracing` at the matching level. The logger never
//! persists anything itself.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use nirvania_types::execution::{LogEntry, LogLevel};

#[derive(Debug, Default)]
pub struct ExecutionLogger {
    entries: Vec<LogEntry>,
}

impl ExecutionLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into(), None);
    }

    pub fn info_with(&mut self, message: impl Into<String>, metadata: Value) {
        self.push(LogLevel::Info, message.into(), Some(metadata));
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into(), None);
    }

    pub fn warn_with(&mut self, message: impl Into<String>, metadata: Value) {
        self.push(LogLevel::Warn, message.into(), Some(metadata));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into(), None);
    }

    pub fn error_with(&mut self, message: impl Into<String>, metadata: Value) {
        self.push(LogLevel::Error, message.into(), Some(metadata));
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, level: LogLevel, message: String, metadata: Option<Value>) {
        match (level, &metadata) {
            (LogLevel::Info, Some(m)) => info!(metadata = %m, "{message}"),
            (LogLevel::Info, None) => info!("{message}"),
            (LogLevel::Warn, Some(m)) => warn!(metadata = %m, "{message}"),
            (LogLevel::Warn, None) => warn!("{message}"),
            (LogLevel::Error, Some(m)) => error!(metadata = %m, "{message}"),
            (LogLevel::Error, None) => error!("{message}"),
        }

        self.entries.push(LogEntry {
            timestamp: self.next_timestamp(),
            level,
            message,
            metadata,
        });
    }

    /// Wall-clock now, clamped so timestamps never go backwards.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }
}
