//! Shared types for logwire
//!
//! This crate contains data structures used across multiple logwire crates.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

// ============================================================================
// Connection Types
// ============================================================================

/// Lifecycle state of the streaming connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake in progress
    #[default]
    Connecting,
    /// Handshake succeeded, frames flow both ways
    Open,
    /// Remote close or explicit teardown
    Closed,
    /// Transport error on an open or opening connection
    Errored,
    /// Reconnect attempts exhausted, no further retries
    Failed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether the connection task has stopped for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Display label for the connection-status indicator
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Open => "Connected",
            Self::Closed => "Disconnected",
            Self::Errored => "Connection error",
            Self::Failed => "Connection failed",
        }
    }

    /// Get display color for this state
    pub fn color(&self) -> Color {
        match self {
            Self::Connecting => Color::Yellow,
            Self::Open => Color::Green,
            Self::Closed => Color::DarkGray,
            Self::Errored => Color::Red,
            Self::Failed => Color::Magenta,
        }
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Normalized severity used for the running counters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeverityBucket {
    Debug,
    Info,
    Warning,
    Error,
}

impl SeverityBucket {
    /// Map a level string to its bucket.
    ///
    /// Case-insensitive. `WARN`/`WARNING` share a bucket, as do `ERROR`/`FATAL`.
    /// Unrecognized levels have no bucket.
    pub fn from_level(level: &str) -> Option<Self> {
        match level.trim().to_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warning),
            "ERROR" | "FATAL" => Some(Self::Error),
            _ => None,
        }
    }

    /// Get display color for this bucket
    pub fn color(&self) -> Color {
        match self {
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }

    /// Short display string (3 chars)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warning => "WRN",
            Self::Error => "ERR",
        }
    }
}

/// Derived classification of a log message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Auth,
    Database,
    Network,
    System,
    Other,
}

/// Keyword table in match priority order
const CATEGORY_KEYWORDS: [(Category, &[&str]); 4] = [
    (Category::Auth, &["login", "auth", "password"]),
    (Category::Database, &["database", "sql", "table", "transaction"]),
    (
        Category::Network,
        &["network", "connection", "socket", "request", "response"],
    ),
    (Category::System, &["system", "server", "process"]),
];

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Auth,
        Self::Database,
        Self::Network,
        Self::System,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Database => "database",
            Self::Network => "network",
            Self::System => "system",
            Self::Other => "other",
        }
    }

    /// Parse a category filter value. Empty and "all" mean no category filter.
    pub fn parse_filter(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Cycle through `None` (all) and every category
    pub fn cycle(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::Auth),
            Some(Self::Auth) => Some(Self::Database),
            Some(Self::Database) => Some(Self::Network),
            Some(Self::Network) => Some(Self::System),
            Some(Self::System) => Some(Self::Other),
            Some(Self::Other) => None,
        }
    }
}

/// Classify a message by keyword, first match wins.
///
/// Total and deterministic: every message maps to exactly one category.
pub fn determine_log_type(message: &str) -> Category {
    let msg = message.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| msg.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Wire shape shared by push frames and snapshot endpoints
#[derive(Deserialize)]
struct RawLogRecord {
    #[serde(default)]
    timestamp: String,
    level: String,
    message: String,
}

impl From<RawLogRecord> for LogRecord {
    fn from(raw: RawLogRecord) -> Self {
        LogRecord::new(raw.timestamp, raw.level, raw.message)
    }
}

/// A single log record received from the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLogRecord")]
pub struct LogRecord {
    /// Timestamp as sent by the server
    pub timestamp: String,

    /// Level as sent by the server (e.g. "ERROR")
    pub level: String,

    /// Message text
    pub message: String,

    /// Category derived from the message
    category: Category,
}

impl LogRecord {
    pub fn new(
        timestamp: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let category = determine_log_type(&message);
        Self {
            timestamp: timestamp.into(),
            level: level.into(),
            message,
            category,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn severity(&self) -> Option<SeverityBucket> {
        SeverityBucket::from_level(&self.level)
    }

    /// Parse the timestamp.
    ///
    /// Accepts RFC 3339 and the server's `YYYY-MM-DD HH:MM:SS` local-time form.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").ok()?;
        Local
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Server statistics snapshot. Absent fields are left untouched on ingestion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_logs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_count: Option<u64>,
}

// ============================================================================
// Request Types
// ============================================================================

/// Logical operations available over the request channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    GetLogs,
    GetStats,
    ClearLogs,
    GetLogsByLevel,
    DownloadLogs,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetLogs => "get_logs",
            Self::GetStats => "get_stats",
            Self::ClearLogs => "clear_logs",
            Self::GetLogsByLevel => "get_logs_by_level",
            Self::DownloadLogs => "download_logs",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format of a downloaded log file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    #[default]
    Html,
    Txt,
}

impl DownloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Txt => "txt",
        }
    }

    /// Content type assumed when the server does not send one
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Txt => "text/plain",
        }
    }
}

/// A downloaded log file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub format: DownloadFormat,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// File name for saving, e.g. `logs_2024-01-01.html`
    pub fn file_name(&self, date: chrono::NaiveDate) -> String {
        format!("logs_{}.{}", date.format("%Y-%m-%d"), self.format.as_str())
    }
}
