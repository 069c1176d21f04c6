use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("rclone executable not found: {0}")]
    NotFound(String),

    #[error("Failed to start rclone: {0}")]
    Spawn(String),

    #[error("rclone did not finish within {0:?}")]
    Timeout(Duration),

    #[error("I/O error while talking to rclone: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ToolError>;
