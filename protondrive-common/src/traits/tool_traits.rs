// File: protondrive-common/src/traits/tool_traits.rs

use async_trait::async_trait;
use protondrive_rclone::{ToolError, ToolOutput, ToolStream};
use std::collections::BTreeMap;
use std::path::Path;

/// Calls into the external synchronization tool.
///
/// Captured calls report a non-zero exit through `ToolOutput::success`;
/// `Err` is reserved for the tool being missing, failing to start or
/// timing out.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn version(&self) -> Result<ToolOutput, ToolError>;

    async fn delete_profile(&self, name: &str) -> Result<ToolOutput, ToolError>;

    /// One-way obscuring of a secret before it is stored.
    async fn obscure_secret(&self, raw: &str) -> Result<ToolOutput, ToolError>;

    async fn create_profile(
        &self,
        name: &str,
        backend_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<ToolOutput, ToolError>;

    async fn show_profile(&self, name: &str) -> Result<ToolOutput, ToolError>;

    async fn list_remotes(&self) -> Result<ToolOutput, ToolError>;

    async fn list_directory(&self, remote_path: &str) -> Result<ToolOutput, ToolError>;

    async fn sync(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        options: &[String],
    ) -> Result<ToolStream, ToolError>;

    async fn mount(
        &self,
        remote_root: &str,
        mount_point: &Path,
        options: &[String],
    ) -> Result<ToolStream, ToolError>;
}
