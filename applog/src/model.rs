//! Core data types for the log service.
//!
//! These are the values the protocol speaks: log entries, daily counters,
//! and health-check results. All of them serialize to the wire JSON shapes
//! directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log entry. Closed set; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// All valid levels, in severity order.
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// The wire form of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Parses the wire form. Returns `None` for anything outside the set.
    pub fn parse(s: &str) -> Option<LogLevel> {
        match s {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingested log entry.
///
/// Entries are immutable once written; the only way they leave the store is
/// the prune operation. `context` is an opaque document, stored and returned
/// verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned identifier, unique within the app.
    pub id: String,

    pub level: LogLevel,

    pub message: String,

    /// Arbitrary structured payload attached by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    /// Correlation identifier for grouping entries of one request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Entry creation time; assigned by the store when not supplied.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate per-level counters for one calendar day.
///
/// At most one record exists per (app, date). Counters only grow; records
/// expire after the configured retention window and then read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    /// UTC calendar date, `YYYY-MM-DD` on the wire.
    pub date: NaiveDate,

    pub debug: u64,
    pub info: u64,
    pub warn: u64,
    pub error: u64,
}

impl DailyStat {
    /// A record with all counters at zero.
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            debug: 0,
            info: 0,
            warn: 0,
            error: 0,
        }
    }

    /// Adds `count` to the counter for `level`.
    pub fn add(&mut self, level: LogLevel, count: u64) {
        match level {
            LogLevel::Debug => self.debug += count,
            LogLevel::Info => self.info += count,
            LogLevel::Warn => self.warn += count,
            LogLevel::Error => self.error += count,
        }
    }

    /// Reads the counter for `level`.
    pub fn get(&self, level: LogLevel) -> u64 {
        match level {
            LogLevel::Debug => self.debug,
            LogLevel::Info => self.info,
            LogLevel::Warn => self.warn,
            LogLevel::Error => self.error,
        }
    }
}

/// Outcome of a single health probe against one configured URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// The URL that was probed.
    pub url: String,

    /// Whether the probe succeeded.
    pub ok: bool,

    /// HTTP status returned by the probe, when one was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    pub timestamp: DateTime<Utc>,
}

/// Result of a prune operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneResult {
    /// Number of entries actually removed.
    pub deleted: u64,
}
