// File: protondrive-core/src/test_utils/helpers.rs

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use protondrive_common::traits::ToolInvoker;
use protondrive_rclone::{ToolError, ToolOutput, ToolStream};

/// The stand-in for `rclone obscure`: stable, and never equal to its input.
pub fn obscure_value(raw: &str) -> String {
    let reversed: String = raw.chars().rev().collect();
    format!("obs_{}", reversed.bytes().map(|b| format!("{:02x}", b)).collect::<String>())
}

struct StoredProfile {
    backend_type: String,
    fields: BTreeMap<String, String>,
}

struct ScriptState {
    tool_missing: bool,
    version: ToolOutput,
    profiles: BTreeMap<String, StoredProfile>,
    obscure_failure: Option<String>,
    delete_always_fails: bool,
    create_failure: Option<String>,
    probe_queue: VecDeque<ToolOutput>,
    probe_default: ToolOutput,
    probe_delay: Option<Duration>,
    folders: BTreeMap<String, ToolOutput>,
    sync_lines: Vec<String>,
    /// `None` keeps the sync running until it is cancelled.
    sync_exit: Option<(bool, Option<i32>)>,
    mount_lines: Vec<String>,
    /// `None` keeps the mount running until it is cancelled.
    mount_exit: Option<(bool, Option<i32>)>,
    calls: Vec<String>,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            tool_missing: false,
            version: ToolOutput::ok("rclone v1.66.0\n- os/version: test\n"),
            profiles: BTreeMap::new(),
            obscure_failure: None,
            delete_always_fails: false,
            create_failure: None,
            probe_queue: VecDeque::new(),
            probe_default: ToolOutput::ok(""),
            probe_delay: None,
            folders: BTreeMap::new(),
            sync_lines: Vec::new(),
            sync_exit: Some((true, Some(0))),
            mount_lines: Vec::new(),
            mount_exit: None,
            calls: Vec::new(),
        }
    }
}

/// In-memory `ToolInvoker` that behaves like rclone with a scripted
/// configuration store. Every call is recorded by name; secrets never are.
#[derive(Default)]
pub struct ScriptedInvoker {
    state: Mutex<ScriptState>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ScriptState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }

    fn record(&self, call: String) -> Result<(), ToolError> {
        self.with_state(|s| {
            s.calls.push(call);
            if s.tool_missing {
                Err(ToolError::NotFound("rclone".into()))
            } else {
                Ok(())
            }
        })
    }

    pub fn set_tool_missing(&self, missing: bool) {
        self.with_state(|s| s.tool_missing = missing);
    }

    /// Seed the store as if an earlier session had configured `name`.
    pub fn add_existing_profile(&self, name: &str, user: &str) {
        let mut fields = BTreeMap::new();
        fields.insert("user".to_string(), user.to_string());
        fields.insert("pass".to_string(), obscure_value("previous"));
        self.with_state(|s| {
            s.profiles.insert(
                name.to_string(),
                StoredProfile {
                    backend_type: "protondrive".to_string(),
                    fields,
                },
            )
        });
    }

    pub fn fail_obscure(&self, stderr: &str) {
        self.with_state(|s| s.obscure_failure = Some(stderr.to_string()));
    }

    pub fn fail_delete(&self) {
        self.with_state(|s| s.delete_always_fails = true);
    }

    pub fn fail_create(&self, stderr: &str) {
        self.with_state(|s| s.create_failure = Some(stderr.to_string()));
    }

    /// Listing of the remote root used once, before the default.
    pub fn push_probe(&self, output: ToolOutput) {
        self.with_state(|s| s.probe_queue.push_back(output));
    }

    pub fn set_probe_default(&self, output: ToolOutput) {
        self.with_state(|s| s.probe_default = output);
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        self.with_state(|s| s.probe_delay = Some(delay));
    }

    /// Listing for a non-root path such as `protondrive:backup`.
    pub fn set_folder(&self, remote_path: &str, output: ToolOutput) {
        self.with_state(|s| s.folders.insert(remote_path.to_string(), output));
    }

    pub fn set_sync_output(&self, lines: &[&str], success: bool, code: Option<i32>) {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.with_state(|s| {
            s.sync_lines = lines;
            s.sync_exit = Some((success, code));
        });
    }

    /// The next sync prints `lines` and then keeps running until cancelled.
    pub fn set_sync_running(&self, lines: &[&str]) {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.with_state(|s| {
            s.sync_lines = lines;
            s.sync_exit = None;
        });
    }

    pub fn set_mount_output(&self, lines: &[&str], exit: Option<(bool, Option<i32>)>) {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.with_state(|s| {
            s.mount_lines = lines;
            s.mount_exit = exit;
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    /// Fields of a stored profile, as `config create` received them.
    pub fn profile_fields(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.with_state(|s| s.profiles.get(name).map(|p| p.fields.clone()))
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn version(&self) -> Result<ToolOutput, ToolError> {
        self.record("version".into())?;
        Ok(self.with_state(|s| s.version.clone()))
    }

    async fn delete_profile(&self, name: &str) -> Result<ToolOutput, ToolError> {
        self.record(format!("delete {}", name))?;
        Ok(self.with_state(|s| {
            if s.delete_always_fails || s.profiles.remove(name).is_none() {
                ToolOutput::failed(1, format!("Couldn't find remote \"{}\"", name))
            } else {
                ToolOutput::ok("")
            }
        }))
    }

    async fn obscure_secret(&self, raw: &str) -> Result<ToolOutput, ToolError> {
        self.record("obscure".into())?;
        Ok(self.with_state(|s| match &s.obscure_failure {
            Some(stderr) => ToolOutput::failed(1, stderr.clone()),
            None => ToolOutput::ok(format!("{}\n", obscure_value(raw))),
        }))
    }

    async fn create_profile(
        &self,
        name: &str,
        backend_type: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<ToolOutput, ToolError> {
        self.record(format!("create {}", name))?;
        Ok(self.with_state(|s| match &s.create_failure {
            Some(stderr) => ToolOutput::failed(1, stderr.clone()),
            None => {
                s.profiles.insert(
                    name.to_string(),
                    StoredProfile {
                        backend_type: backend_type.to_string(),
                        fields: fields.clone(),
                    },
                );
                ToolOutput::ok("")
            }
        }))
    }

    async fn show_profile(&self, name: &str) -> Result<ToolOutput, ToolError> {
        self.record(format!("show {}", name))?;
        Ok(self.with_state(|s| match s.profiles.get(name) {
            Some(profile) => {
                let mut text = format!("[{}]\ntype = {}\n", name, profile.backend_type);
                for (k, v) in &profile.fields {
                    text.push_str(&format!("{} = {}\n", k, v));
                }
                ToolOutput::ok(text)
            }
            None => ToolOutput::failed(1, format!("Couldn't find remote \"{}\"", name)),
        }))
    }

    async fn list_remotes(&self) -> Result<ToolOutput, ToolError> {
        self.record("listremotes".into())?;
        Ok(self.with_state(|s| {
            let text: String = s.profiles.keys().map(|name| format!("{}:\n", name)).collect();
            ToolOutput::ok(text)
        }))
    }

    async fn list_directory(&self, remote_path: &str) -> Result<ToolOutput, ToolError> {
        self.record(format!("lsd {}", remote_path))?;
        if remote_path.ends_with(':') {
            let delay = self.with_state(|s| s.probe_delay);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            return Ok(self.with_state(|s| {
                s.probe_queue.pop_front().unwrap_or_else(|| s.probe_default.clone())
            }));
        }
        Ok(self.with_state(|s| {
            s.folders
                .get(remote_path)
                .cloned()
                .unwrap_or_else(|| ToolOutput::failed(3, "directory not found"))
        }))
    }

    async fn sync(
        &self,
        local_dir: &Path,
        remote_dir: &str,
        options: &[String],
    ) -> Result<ToolStream, ToolError> {
        self.record(format!("sync {} {} {}", local_dir.display(), remote_dir, options.join(" ")))?;
        let (lines, exit) = self.with_state(|s| (s.sync_lines.clone(), s.sync_exit));
        Ok(match exit {
            Some((success, code)) => ToolStream::scripted(lines, success, code),
            None => ToolStream::pending(lines),
        })
    }

    async fn mount(
        &self,
        remote_root: &str,
        mount_point: &Path,
        options: &[String],
    ) -> Result<ToolStream, ToolError> {
        self.record(format!("mount {} {} {}", remote_root, mount_point.display(), options.join(" ")))?;
        let (lines, exit) = self.with_state(|s| (s.mount_lines.clone(), s.mount_exit));
        Ok(match exit {
            Some((success, code)) => ToolStream::scripted(lines, success, code),
            None => ToolStream::pending(lines),
        })
    }
}
