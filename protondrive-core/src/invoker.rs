// src/invoker.rs

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use protondrive_common::traits::ToolInvoker;
use protondrive_rclone::{RcloneClient, RcloneOptions, ToolError, ToolOutput, ToolStream};

use crate::config::ControllerConfig;

/// `ToolInvoker` backed by the real rclone executable.
#[derive(Clone)]
pub struct RcloneInvoker {
    client: Arc<RcloneClient>,
}

impl RcloneInvoker {
    pub fn new(options: RcloneOptions) -> Self {
        Self {
            client: Arc::new(RcloneClient::new(options)),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.rclone_options())
    }

    pub fn client(&self) -> &RcloneClient {
        &self.client
    }
}

#[async_trait]
impl ToolInvoker for RcloneInvoker {
    async fn version(&self) -> Result<ToolOutput, ToolError> {
        self.client.version().await
    }

    async fn delete_profile(&self, name: &str) -> Result<ToolOutput, ToolError> {
        self.client.delete_remote(name).await
    }

    async fn obscure_secret(&self, raw: &str) -> Result<ToolOutput, ToolError> {
        self.client.obscure(raw).await
    }

    async fn create_profile(
        &self,
        name: &str,
        backend_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<ToolOutput, ToolError> {
        self.client.create_remote(name, backend_type, fields).await
    }

    async fn show_profile(&self, name: &str) -> Result<ToolOutput, ToolError> {
        self.client.show_remote(name).await
    }

    async fn list_remotes(&self) -> Result<ToolOutput, ToolError> {
        self.client.list_remotes().await
    }

    async fn list_directory(&self, remote_path: &str) -> Result<ToolOutput, ToolError> {
        self.client.lsd(remote_path).await
    }

    async fn sync(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        options: &[String],
    ) -> Result<ToolStream, ToolError> {
        self.client.sync(local_dir, remote_dir, options).await
    }

    async fn mount(
        &self,
        remote_root: &str,
        mount_point: &Path,
        options: &[String],
    ) -> Result<ToolStream, ToolError> {
        self.client.mount(remote_root, mount_point, options).await
    }
}
