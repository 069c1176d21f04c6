// src/controller/mount.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use protondrive_common::models::{Severity, ToolLine, ToolStream};

use crate::eventbus::ActivityLog;

const UNMOUNT_GRACE: Duration = Duration::from_secs(5);

/// A running `rclone mount`. Dropping the handle terminates the process.
pub struct MountHandle {
    id: Uuid,
    mount_point: PathBuf,
    remote_root: String,
    stream: ToolStream,
    startup_output: Vec<String>,
    running: bool,
    activity: ActivityLog,
}

impl MountHandle {
    pub(crate) fn new(
        mount_point: &Path,
        remote_root: String,
        stream: ToolStream,
        startup_output: Vec<String>,
        running: bool,
        activity: ActivityLog,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            mount_point: mount_point.to_path_buf(),
            remote_root,
            stream,
            startup_output,
            running,
            activity,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn remote_root(&self) -> &str {
        &self.remote_root
    }

    /// Lines printed during the settle window.
    pub fn startup_output(&self) -> &[String] {
        &self.startup_output
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Next output line of the mount process, `None` once it has exited.
    pub async fn next_line(&mut self) -> Option<String> {
        if !self.running {
            return None;
        }
        match self.stream.next_line().await {
            Some(ToolLine::Output(line)) => Some(line),
            Some(ToolLine::Exit { success, code }) => {
                self.mark_exited(success, code).await;
                None
            }
            None => {
                self.mark_exited(false, None).await;
                None
            }
        }
    }

    async fn mark_exited(&mut self, success: bool, code: Option<i32>) {
        self.running = false;
        if success || self.stream.is_cancelled() {
            self.activity
                .record(Severity::Info, format!("Unmounted {}", self.mount_point.display()))
                .await;
        } else {
            self.activity.record(
                Severity::Error,
                format!(
                    "Mount of {} on {} stopped unexpectedly (exit code {:?})",
                    self.remote_root,
                    self.mount_point.display(),
                    code
                ),
            )
            .await;
        }
    }

    /// Terminate the mount process and wait briefly for it to exit.
    /// Whether the kernel mount is released is up to rclone and the OS.
    pub async fn unmount(mut self) {
        if !self.running {
            return;
        }
        info!("Unmounting {} ({})", self.mount_point.display(), self.id);
        self.stream.cancel();
        let drained = tokio::time::timeout(UNMOUNT_GRACE, async {
            while self.next_line().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("rclone mount {} did not exit within {:?}", self.id, UNMOUNT_GRACE);
        }
    }
}

impl std::fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle")
            .field("id", &self.id)
            .field("mount_point", &self.mount_point)
            .field("remote_root", &self.remote_root)
            .field("running", &self.running)
            .finish()
    }
}
