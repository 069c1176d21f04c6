use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of the most recent probe. Recomputed on every probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Unknown,
    Disconnected,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Unknown => "Unknown",
            ConnectionStatus::Disconnected => "Not connected",
            ConnectionStatus::Connected => "Connected",
        };
        f.write_str(s)
    }
}

/// Where the controller is in the configure / validate / monitor cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Unconfigured,
    Configuring,
    ConfiguredUntested,
    Connected,
    ConfigFailed(String),
    ConnectionFailed { reason: String, two_factor: bool },
}

impl LifecycleState {
    /// A profile is believed to exist in the configuration store.
    pub fn has_profile(&self) -> bool {
        matches!(
            self,
            LifecycleState::ConfiguredUntested
                | LifecycleState::Connected
                | LifecycleState::ConnectionFailed { .. }
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            LifecycleState::ConfigFailed(_) | LifecycleState::ConnectionFailed { .. }
        )
    }

    pub fn needs_fresh_code(&self) -> bool {
        matches!(self, LifecycleState::ConnectionFailed { two_factor: true, .. })
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Unconfigured => f.write_str("Not configured"),
            LifecycleState::Configuring => f.write_str("Configuring"),
            LifecycleState::ConfiguredUntested => f.write_str("Configured, not tested"),
            LifecycleState::Connected => f.write_str("Connected"),
            LifecycleState::ConfigFailed(reason) => write!(f, "Configuration failed: {}", reason),
            LifecycleState::ConnectionFailed { reason, two_factor: true } => {
                write!(f, "Connection failed (two-factor): {}", reason)
            }
            LifecycleState::ConnectionFailed { reason, .. } => write!(f, "Connection failed: {}", reason),
        }
    }
}
