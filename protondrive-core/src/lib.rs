// src/lib.rs

pub mod config;
pub mod controller;
pub mod eventbus;
pub mod invoker;
pub mod tasks;
pub mod test_utils;

pub use config::ControllerConfig;
pub use controller::{ConnectionController, MountHandle, SyncProgress};
pub use eventbus::{ControllerEvent, EventBus};
pub use invoker::RcloneInvoker;
pub use protondrive_common::error::{ControllerError, Result};
