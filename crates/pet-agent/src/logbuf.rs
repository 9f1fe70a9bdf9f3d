//! Bounded in-memory log ring per agent
//!
//! Mirrors to `tracing` and keeps the last entries for inspection panels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Ring capacity
pub const LOG_CAPACITY: usize = 100;

/// Log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity
    pub level: LogLevel,

    /// Message text
    pub message: String,

    /// When it was logged
    pub timestamp: DateTime<Utc>,

    /// Structured payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Bounded log buffer
#[derive(Default)]
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&self, level: LogLevel, message: &str, data: Option<Value>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= LOG_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            level,
            message: message.to_string(),
            timestamp: Utc::now(),
            data,
        });
    }

    /// Snapshot of current entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
