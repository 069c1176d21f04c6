// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use protondrive_common::{ControllerError, Result};
use protondrive_rclone::RcloneOptions;

pub const ENV_REMOTE: &str = "PROTONDRIVE_REMOTE";
pub const ENV_RCLONE: &str = "PROTONDRIVE_RCLONE";
pub const ENV_POLL_SECS: &str = "PROTONDRIVE_POLL_SECS";

/// Controller settings. Every field has a default, so a config file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub remote_name: String,
    pub backend_type: String,
    pub rclone_binary: PathBuf,
    /// Passed before every rclone subcommand, e.g. `["--config", "/path"]`.
    pub extra_args: Vec<String>,
    /// Config key the one-time code is stored under on create.
    pub two_factor_field: String,
    pub poll_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub mount_settle_millis: u64,
    pub stream_buffer: usize,
    pub event_buffer: usize,
    pub sync_args: Vec<String>,
    pub mount_args: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            remote_name: "protondrive".to_string(),
            backend_type: "protondrive".to_string(),
            rclone_binary: PathBuf::from("rclone"),
            extra_args: Vec::new(),
            two_factor_field: "2fa".to_string(),
            poll_interval_secs: 30,
            probe_timeout_secs: 20,
            command_timeout_secs: 60,
            mount_settle_millis: 1500,
            stream_buffer: 256,
            event_buffer: 1024,
            sync_args: vec!["-v".to_string(), "--progress".to_string()],
            mount_args: vec!["--vfs-cache-mode".to_string(), "full".to_string()],
        }
    }
}

impl ControllerConfig {
    /// `<config dir>/protondrive-linux/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("protondrive-linux").join("config.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ControllerConfig = serde_json::from_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Load the file at `path` (or the default location when it exists),
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load_from(&p)?,
                _ => {
                    info!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(ENV_REMOTE) {
            self.remote_name = name;
        }
        if let Some(bin) = lookup(ENV_RCLONE) {
            self.rclone_binary = PathBuf::from(bin);
        }
        if let Some(secs) = lookup(ENV_POLL_SECS) {
            self.poll_interval_secs = secs
                .trim()
                .parse()
                .map_err(|_| ControllerError::Config(format!("{} must be a number of seconds, got '{}'", ENV_POLL_SECS, secs)))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote_name.trim().is_empty() || self.remote_name.contains(':') {
            return Err(ControllerError::Config(format!("invalid remote name '{}'", self.remote_name)));
        }
        if self.backend_type.trim().is_empty() {
            return Err(ControllerError::Config("backend_type must not be empty".into()));
        }
        if self.two_factor_field.trim().is_empty() {
            return Err(ControllerError::Config("two_factor_field must not be empty".into()));
        }
        let zero = [
            ("poll_interval_secs", self.poll_interval_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("command_timeout_secs", self.command_timeout_secs),
            ("stream_buffer", self.stream_buffer as u64),
            ("event_buffer", self.event_buffer as u64),
        ];
        if let Some((field, _)) = zero.iter().find(|(_, v)| *v == 0) {
            return Err(ControllerError::Config(format!("{} must be greater than zero", field)));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn mount_settle(&self) -> Duration {
        Duration::from_millis(self.mount_settle_millis)
    }

    pub fn rclone_options(&self) -> RcloneOptions {
        RcloneOptions {
            binary: self.rclone_binary.clone(),
            global_args: self.extra_args.clone(),
            command_timeout: self.command_timeout(),
            stream_buffer: self.stream_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = ControllerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.mount_args, vec!["--vfs-cache-mode", "full"]);
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [(ENV_REMOTE, "pd2"), (ENV_POLL_SECS, " 5 ")].into_iter().collect();
        let mut config = ControllerConfig::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.remote_name, "pd2");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.rclone_binary, PathBuf::from("rclone"));
    }

    #[test]
    fn bad_poll_interval_is_a_config_error() {
        let mut config = ControllerConfig::default();
        let err = config
            .apply_env_from(|k| (k == ENV_POLL_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ControllerError::Config(_)));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ControllerConfig { poll_interval_secs: 0, ..ControllerConfig::default() };
        assert!(matches!(config.validate(), Err(ControllerError::Config(m)) if m.contains("poll_interval_secs")));
    }

    #[test]
    fn remote_name_cannot_contain_colon() {
        let config = ControllerConfig { remote_name: "pd:".into(), ..ControllerConfig::default() };
        assert!(config.validate().is_err());
    }
}
