// ================================================================
// File: protondrive-common/src/error.rs
// ================================================================

use protondrive_rclone::ToolError;
use thiserror::Error;

/// Every failure the controller surfaces. Diagnostic text comes from the
/// external tool and never contains the raw password.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to process password: {0}")]
    ObscureFailed(String),

    #[error("Configuration failed: {0}")]
    ConfigCreateFailed(String),

    #[error("Connection failed: {0}")]
    ProbeFailed(String),

    #[error("Connection failed, two-factor code rejected: {0}")]
    ProbeFailedTwoFactor(String),

    #[error("Sync failed (partial: {partial}): {diagnostic}")]
    SyncFailed { partial: bool, diagnostic: String },

    #[error("Mount failed: {0}")]
    MountFailed(String),

    #[error("A configuration attempt is already in progress")]
    ConfigureInProgress,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ControllerError {
    /// Convert an invoker failure. A missing executable is always
    /// `ToolNotFound`; anything else is wrapped by `wrap`.
    pub fn from_tool(err: ToolError, wrap: impl FnOnce(String) -> ControllerError) -> Self {
        match err {
            ToolError::NotFound(binary) => ControllerError::ToolNotFound(binary),
            other => wrap(other.to_string()),
        }
    }

    pub fn is_two_factor(&self) -> bool {
        matches!(self, ControllerError::ProbeFailedTwoFactor(_))
    }

    /// Raw diagnostic text without the variant prefix.
    pub fn diagnostic(&self) -> String {
        match self {
            ControllerError::ToolNotFound(d)
            | ControllerError::ObscureFailed(d)
            | ControllerError::ConfigCreateFailed(d)
            | ControllerError::ProbeFailed(d)
            | ControllerError::ProbeFailedTwoFactor(d)
            | ControllerError::MountFailed(d)
            | ControllerError::InvalidInput(d)
            | ControllerError::Config(d) => d.clone(),
            ControllerError::SyncFailed { diagnostic, .. } => diagnostic.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_tool_maps_to_tool_not_found() {
        let err = ControllerError::from_tool(
            ToolError::NotFound("rclone".into()),
            ControllerError::ProbeFailed,
        );
        assert!(matches!(err, ControllerError::ToolNotFound(ref b) if b == "rclone"));
    }

    #[test]
    fn other_tool_errors_use_the_wrapper() {
        let err = ControllerError::from_tool(
            ToolError::Timeout(Duration::from_secs(1)),
            ControllerError::MountFailed,
        );
        assert!(matches!(err, ControllerError::MountFailed(_)));
        assert!(!err.is_two_factor());
    }
}
