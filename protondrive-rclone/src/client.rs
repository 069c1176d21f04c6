use crate::error::Result;
use crate::models::{RcloneOptions, ToolLine, ToolOutput, ToolStream};
use crate::ToolError;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Config keys whose values must never reach a log line.
const SECRET_KEYS: &[&str] = &["pass", "password", "2fa", "otp", "token"];

/// Thin async wrapper around the rclone executable.
pub struct RcloneClient {
    options: RcloneOptions,
}

impl RcloneClient {
    pub fn new(options: RcloneOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RcloneOptions {
        &self.options
    }

    pub async fn version(&self) -> Result<ToolOutput> {
        self.run(&["version".to_string()], None).await
    }

    pub async fn list_remotes(&self) -> Result<ToolOutput> {
        self.run(&["listremotes".to_string()], None).await
    }

    pub async fn show_remote(&self, name: &str) -> Result<ToolOutput> {
        self.run(&args(&["config", "show", name]), None).await
    }

    pub async fn delete_remote(&self, name: &str) -> Result<ToolOutput> {
        self.run(&args(&["config", "delete", name]), None).await
    }

    /// Obscure a secret. The secret goes through stdin (`rclone obscure -`)
    /// so it never shows up in the process table.
    pub async fn obscure(&self, secret: &str) -> Result<ToolOutput> {
        let mut input = Zeroizing::new(String::with_capacity(secret.len() + 1));
        input.push_str(secret);
        input.push('\n');
        self.run(&args(&["obscure", "-"]), Some(input.as_bytes())).await
    }

    pub async fn create_remote(
        &self,
        name: &str,
        backend_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<ToolOutput> {
        let mut argv = args(&["config", "create", name, backend_type]);
        argv.extend(fields.iter().map(|(k, v)| format!("{}={}", k, v)));
        self.run(&argv, None).await
    }

    pub async fn lsd(&self, remote_path: &str) -> Result<ToolOutput> {
        self.run(&args(&["lsd", remote_path]), None).await
    }

    pub async fn sync(&self, local_dir: &Path, remote_dir: &str, extra: &[String]) -> Result<ToolStream> {
        let mut argv = vec![
            "sync".to_string(),
            local_dir.display().to_string(),
            remote_dir.to_string(),
        ];
        argv.extend(extra.iter().cloned());
        self.spawn_streaming(&argv).await
    }

    pub async fn mount(&self, remote_root: &str, mount_point: &Path, extra: &[String]) -> Result<ToolStream> {
        let mut argv = vec![
            "mount".to_string(),
            remote_root.to_string(),
            mount_point.display().to_string(),
        ];
        argv.extend(extra.iter().cloned());
        self.spawn_streaming(&argv).await
    }

    fn command(&self, argv: &[String]) -> Command {
        let mut cmd = Command::new(&self.options.binary);
        cmd.args(&self.options.global_args)
            .args(argv)
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> ToolError {
        if e.kind() == ErrorKind::NotFound {
            ToolError::NotFound(self.options.binary.display().to_string())
        } else {
            ToolError::Spawn(e.to_string())
        }
    }

    /// Run to completion and capture both output streams.
    async fn run(&self, argv: &[String], stdin: Option<&[u8]>) -> Result<ToolOutput> {
        debug!("rclone {}", redacted_command_line(argv));
        let mut cmd = self.command(argv);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            pipe.shutdown().await?;
        }

        let output = tokio::time::timeout(self.options.command_timeout, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout(self.options.command_timeout))??;

        let result = ToolOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !result.success {
            debug!("rclone {} exited with {:?}", argv[0], result.exit_code);
        }
        Ok(result)
    }

    /// Spawn a long-running command and forward stdout and stderr, line by
    /// line, into a bounded channel. The reader tasks wait for channel
    /// capacity, so a slow consumer backs up into the pipe instead of memory.
    async fn spawn_streaming(&self, argv: &[String]) -> Result<ToolStream> {
        info!("Starting rclone {}", redacted_command_line(argv));
        let mut cmd = self.command(argv);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let pid = child.id();
        debug!("rclone {} started with PID {:?}", argv[0], pid);

        let (tx, rx) = mpsc::channel(self.options.stream_buffer.max(1));
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
        }

        let label = argv[0].clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx => {
                    info!("Terminating rclone {} (PID {:?})", label, pid);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to terminate rclone {}: {}", label, e);
                    }
                    child.wait().await
                }
            };

            // Exit must be the last item, after both pipes are drained.
            for reader in readers {
                let _ = reader.await;
            }

            let exit = match status {
                Ok(status) => {
                    info!("rclone {} exited with status {:?}", label, status.code());
                    ToolLine::Exit { success: status.success(), code: status.code() }
                }
                Err(e) => {
                    warn!("Error waiting for rclone {}: {}", label, e);
                    ToolLine::Exit { success: false, code: None }
                }
            };
            let _ = tx.send(exit).await;
        });

        Ok(ToolStream::new(rx, kill_tx))
    }
}

async fn forward_lines<R>(pipe: R, tx: mpsc::Sender<ToolLine>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(ToolLine::Output(line)).await.is_err() {
            break;
        }
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Render a command line for logs with secret-bearing `key=value` pairs masked.
pub fn redacted_command_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, _)) if SECRET_KEYS.contains(&key.to_ascii_lowercase().as_str()) => {
                format!("{}=***", key)
            }
            _ => arg.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_masks_secrets() {
        let argv = args(&["config", "create", "pd", "protondrive", "user=a@b.c", "pass=abc", "2fa=123456"]);
        let line = redacted_command_line(&argv);
        assert_eq!(line, "config create pd protondrive user=a@b.c pass=*** 2fa=***");
    }
}
