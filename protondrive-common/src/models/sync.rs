use crate::models::activity::Severity;
use serde::{Deserialize, Serialize};

/// An item of a running sync. `Finished` is always the terminal item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncProgressLine {
    Output { text: String, severity: Severity },
    Finished {
        success: bool,
        exit_code: Option<i32>,
        /// The remote may hold part of the transfer.
        partial: bool,
    },
}

impl SyncProgressLine {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncProgressLine::Finished { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub lines: usize,
    pub transfer_lines: usize,
    pub errors: usize,
    pub exit_code: Option<i32>,
}

/// Severity of an rclone sync output line.
pub fn classify_sync_line(line: &str) -> Severity {
    if line.contains("ERROR") {
        Severity::Error
    } else if line.contains("Transferred:") {
        Severity::Success
    } else {
        Severity::Info
    }
}

/// Lines that show data actually reached the remote.
pub fn is_transfer_line(line: &str) -> bool {
    line.contains("Transferred:") || line.contains("Copied (")
}
