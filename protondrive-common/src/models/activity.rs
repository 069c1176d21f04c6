use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// One line of the controller's activity log. `seq` orders events; the
/// timestamp is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub seq: u64,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(seq: u64, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            seq,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
