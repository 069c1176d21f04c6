use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// How to reach the rclone executable and the limits applied to each call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcloneOptions {
    pub binary: PathBuf,
    /// Arguments placed before every subcommand, e.g. `--config <file>`.
    pub global_args: Vec<String>,
    pub command_timeout: Duration,
    /// Capacity of the line channel used by streaming commands.
    pub stream_buffer: usize,
}

impl Default for RcloneOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("rclone"),
            global_args: Vec::new(),
            command_timeout: Duration::from_secs(60),
            stream_buffer: 256,
        }
    }
}

/// Captured result of a short-lived rclone invocation.
///
/// A non-zero exit is a normal value here, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Best human-readable explanation of what the tool reported.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("rclone exited with code {}", code),
            None => "rclone was terminated by a signal".to_string(),
        }
    }
}

/// One item of a streaming invocation. `Exit` is always the last item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLine {
    Output(String),
    Exit { success: bool, code: Option<i32> },
}

/// Live, ordered output of a long-running rclone process (sync, mount).
///
/// Dropping the stream or calling [`ToolStream::cancel`] terminates the
/// underlying process on a best-effort basis.
pub struct ToolStream {
    lines: mpsc::Receiver<ToolLine>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl ToolStream {
    pub fn new(lines: mpsc::Receiver<ToolLine>, kill_tx: oneshot::Sender<()>) -> Self {
        Self {
            lines,
            kill_tx: Some(kill_tx),
        }
    }

    /// A stream that replays `lines` and then exits with the given status.
    pub fn scripted<I, S>(lines: I, success: bool, code: Option<i32>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<ToolLine> = lines
            .into_iter()
            .map(|l| ToolLine::Output(l.into()))
            .chain(std::iter::once(ToolLine::Exit { success, code }))
            .collect();
        let (tx, rx) = mpsc::channel(items.len());
        for item in items {
            let _ = tx.try_send(item);
        }
        let (kill_tx, _kill_rx) = oneshot::channel();
        Self::new(rx, kill_tx)
    }

    /// A stream that replays `lines` and stays open until cancelled, like a
    /// mount that keeps running in the foreground.
    pub fn pending<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = lines.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(items.len() + 1);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            for item in items {
                if tx.send(ToolLine::Output(item)).await.is_err() {
                    return;
                }
            }
            let _ = kill_rx.await;
            let _ = tx.send(ToolLine::Exit { success: false, code: None }).await;
        });
        Self::new(rx, kill_tx)
    }

    pub async fn next_line(&mut self) -> Option<ToolLine> {
        self.lines.recv().await
    }

    pub fn poll_next_line(&mut self, cx: &mut Context<'_>) -> Poll<Option<ToolLine>> {
        self.lines.poll_recv(cx)
    }

    /// Ask the process to terminate. Remaining output is still delivered.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kill_tx.is_none()
    }
}

impl Drop for ToolStream {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A single folder row from `rclone lsd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    /// `date time` columns as printed by rclone.
    pub modified: Option<String>,
    /// Object count; rclone prints -1 when the backend does not know it.
    pub count: Option<i64>,
}

impl DirectoryEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modified: None,
            count: None,
        }
    }
}
