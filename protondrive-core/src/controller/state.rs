// src/controller/state.rs

use protondrive_common::models::{ConnectionStatus, DirectoryListing, LifecycleState, RemoteProfile};
use protondrive_common::ControllerError;

/// Who asked for a probe. Background polls never override a configure
/// that is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOrigin {
    Explicit,
    Configure,
    Background,
}

/// Status and lifecycle before and after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous_status: ConnectionStatus,
    pub previous_lifecycle: LifecycleState,
    pub status: ConnectionStatus,
    pub lifecycle: LifecycleState,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.previous_status != self.status || self.previous_lifecycle != self.lifecycle
    }

    pub fn status_changed(&self) -> bool {
        self.previous_status != self.status
    }
}

/// Everything the controller remembers between calls.
#[derive(Debug, Default)]
pub struct ControllerState {
    pub lifecycle: LifecycleState,
    pub status: ConnectionStatus,
    /// Ticket of the probe that last wrote `status`.
    status_ticket: u64,
    pub stored_user: Option<String>,
    pub last_profile: Option<RemoteProfile>,
}

impl ControllerState {
    pub fn set_lifecycle(&mut self, lifecycle: LifecycleState) -> Transition {
        let previous_lifecycle = std::mem::replace(&mut self.lifecycle, lifecycle);
        Transition {
            previous_status: self.status,
            previous_lifecycle,
            status: self.status,
            lifecycle: self.lifecycle.clone(),
        }
    }

    /// Write a probe result. Returns `None` when the write is skipped: a
    /// probe started later has already written, or a background probe
    /// raced a configure.
    pub fn apply_probe(
        &mut self,
        ticket: u64,
        origin: ProbeOrigin,
        result: &Result<DirectoryListing, ControllerError>,
    ) -> Option<Transition> {
        if ticket <= self.status_ticket {
            return None;
        }
        if self.lifecycle == LifecycleState::Configuring && origin != ProbeOrigin::Configure {
            return None;
        }

        let previous_status = self.status;
        let previous_lifecycle = self.lifecycle.clone();
        self.status_ticket = ticket;

        match result {
            Ok(_) => {
                self.status = ConnectionStatus::Connected;
                self.lifecycle = LifecycleState::Connected;
            }
            Err(err) => {
                self.status = ConnectionStatus::Disconnected;
                // Without a profile there is nothing to mark as failed.
                if self.lifecycle != LifecycleState::Unconfigured {
                    self.lifecycle = LifecycleState::ConnectionFailed {
                        reason: err.diagnostic(),
                        two_factor: err.is_two_factor(),
                    };
                }
            }
        }

        Some(Transition {
            previous_status,
            previous_lifecycle,
            status: self.status,
            lifecycle: self.lifecycle.clone(),
        })
    }
}
