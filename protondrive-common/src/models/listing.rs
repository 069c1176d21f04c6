use protondrive_rclone::parser::parse_lsd;
use protondrive_rclone::DirectoryEntry;
use serde::{Deserialize, Serialize};

/// Folders found under a remote path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub remote_path: String,
    pub entries: Vec<DirectoryEntry>,
}

impl DirectoryListing {
    pub fn parse(remote_path: impl Into<String>, lsd_stdout: &str) -> Self {
        Self {
            remote_path: remote_path.into(),
            entries: parse_lsd(lsd_stdout),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line summary used in activity messages.
    pub fn summary(&self) -> String {
        if self.entries.is_empty() {
            format!("{} is empty", self.remote_path)
        } else {
            format!(
                "{} ({} folders): {}",
                self.remote_path,
                self.entries.len(),
                self.names().join(", ")
            )
        }
    }
}
