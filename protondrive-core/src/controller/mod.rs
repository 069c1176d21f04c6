//! src/controller/mod.rs
//!
//! The connection lifecycle controller: configures the named rclone remote,
//! probes it, keeps the lifecycle state and reports every step on the
//! event bus.

pub mod diagnostics;
pub mod mount;
pub mod state;
pub mod sync;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use protondrive_common::models::{
    remote_path, remote_root, ConnectionStatus, DirectoryListing, LifecycleState,
    RemoteCredentials, RemoteProfile, Severity, ToolLine,
};
use protondrive_common::traits::ToolInvoker;
use protondrive_common::{ControllerError, Result};
use protondrive_rclone::parser::{config_value, first_line, redact_profile_text, remote_exists};

use crate::config::ControllerConfig;
use crate::eventbus::{ActivityLog, ControllerEvent, EventBus};
use crate::invoker::RcloneInvoker;
use crate::tasks::status_poll::{spawn_status_poll_task, StatusPollHandle};

use self::diagnostics::{probe_error, scrub_secret, FRESH_CODE_HINT};
use self::state::{ControllerState, ProbeOrigin, Transition};

pub use self::mount::MountHandle;
pub use self::sync::SyncProgress;

pub struct ConnectionController {
    config: ControllerConfig,
    invoker: Arc<dyn ToolInvoker>,
    activity: ActivityLog,
    state: RwLock<ControllerState>,
    configure_lock: Mutex<()>,
    probe_tickets: AtomicU64,
}

impl ConnectionController {
    pub fn new(config: ControllerConfig, invoker: Arc<dyn ToolInvoker>, event_bus: EventBus) -> Self {
        Self {
            config,
            invoker,
            activity: ActivityLog::new(event_bus),
            state: RwLock::new(ControllerState::default()),
            configure_lock: Mutex::new(()),
            probe_tickets: AtomicU64::new(0),
        }
    }

    /// Controller talking to the rclone binary named in `config`.
    pub fn with_rclone(config: ControllerConfig, event_bus: EventBus) -> Self {
        let invoker = Arc::new(RcloneInvoker::from_config(&config));
        Self::new(config, invoker, event_bus)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        self.activity.bus()
    }

    pub fn remote_root(&self) -> String {
        remote_root(&self.config.remote_name)
    }

    pub async fn subscribe(&self) -> mpsc::Receiver<ControllerEvent> {
        self.event_bus().subscribe(Some(self.config.event_buffer)).await
    }

    pub async fn state(&self) -> LifecycleState {
        self.state.read().await.lifecycle.clone()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.read().await.status
    }

    /// User name found in the stored profile, for pre-filling a login form.
    pub async fn stored_user(&self) -> Option<String> {
        self.state.read().await.stored_user.clone()
    }

    pub async fn last_profile(&self) -> Option<RemoteProfile> {
        self.state.read().await.last_profile.clone()
    }

    /// Check that rclone runs and look for a remote left by an earlier
    /// session.
    pub async fn initialize(&self) -> Result<LifecycleState> {
        let version = match self.invoker.version().await {
            Ok(out) if out.success => out,
            Ok(out) => {
                let err = ControllerError::ProbeFailed(out.diagnostic());
                self.activity
                    .record(Severity::Error, format!("rclone is installed but not usable: {}", out.diagnostic()))
                    .await;
                return Err(err);
            }
            Err(e) => {
                let err = ControllerError::from_tool(e, ControllerError::ProbeFailed);
                self.activity.record(Severity::Error, err.to_string()).await;
                return Err(err);
            }
        };
        self.activity
            .record(Severity::Info, format!("Using {}", first_line(&version.stdout).unwrap_or("rclone")))
            .await;

        let name = &self.config.remote_name;
        let remotes = match self.invoker.list_remotes().await {
            Ok(out) if out.success => out.stdout,
            Ok(out) => {
                warn!("Could not list rclone remotes: {}", out.diagnostic());
                String::new()
            }
            Err(e) => {
                warn!("Could not list rclone remotes: {}", e);
                String::new()
            }
        };

        if !remote_exists(&remotes, name) {
            self.activity
                .record(Severity::Info, format!("No remote named '{}' is configured yet", name))
                .await;
            return Ok(self.state().await);
        }

        match self.invoker.show_profile(name).await {
            Ok(out) if out.success => {
                let user = config_value(&out.stdout, "user");
                let transition = {
                    let mut st = self.state.write().await;
                    st.stored_user = user.clone();
                    (st.lifecycle == LifecycleState::Unconfigured)
                        .then(|| st.set_lifecycle(LifecycleState::ConfiguredUntested))
                };
                if let Some(t) = transition {
                    self.publish_status(&t).await;
                }
                let owner = user.map(|u| format!(" for {}", u)).unwrap_or_default();
                self.activity
                    .record(Severity::Info, format!("Found existing remote '{}'{}", name, owner))
                    .await;
            }
            Ok(out) => {
                self.activity
                    .record(
                        Severity::Warning,
                        format!("Remote '{}' is listed but could not be read: {}", name, out.diagnostic()),
                    )
                    .await;
            }
            Err(e) => {
                self.activity
                    .record(Severity::Warning, format!("Remote '{}' could not be read: {}", name, e))
                    .await;
            }
        }

        Ok(self.state().await)
    }

    /// Replace the stored remote with a new one and test it.
    ///
    /// The profile is returned once it has been created. The outcome of the
    /// connection test that follows is reported through [`Self::state`] and
    /// the event bus. The raw password is wiped when this call returns.
    pub async fn configure(
        &self,
        email: &str,
        password: impl Into<Zeroizing<String>>,
        otp: Option<&str>,
    ) -> Result<RemoteProfile> {
        let password: Zeroizing<String> = password.into();
        let email = email.trim();
        if email.is_empty() {
            return Err(ControllerError::InvalidInput("e-mail address must not be empty".into()));
        }
        if password.is_empty() {
            return Err(ControllerError::InvalidInput("password must not be empty".into()));
        }
        let otp = otp.map(str::trim).filter(|code| !code.is_empty());

        let _guard = self
            .configure_lock
            .try_lock()
            .map_err(|_| ControllerError::ConfigureInProgress)?;

        let name = self.config.remote_name.clone();
        self.transition_to(LifecycleState::Configuring).await;
        self.activity
            .record(Severity::Info, format!("Configuring remote '{}' for {}", name, email))
            .await;

        let obscured = match self.obscure(&password).await {
            Ok(obscured) => obscured,
            Err(err) => return Err(self.fail_configure(err).await),
        };

        match self.invoker.delete_profile(&name).await {
            Ok(out) if out.success => debug!("Removed previous remote '{}'", name),
            Ok(out) => debug!("No previous remote '{}' removed: {}", name, out.diagnostic()),
            Err(e) => debug!("Deleting previous remote '{}' failed: {}", name, e),
        }

        let profile = RemoteProfile::new(
            name.clone(),
            self.config.backend_type.clone(),
            RemoteCredentials {
                user: email.to_string(),
                obscured_secret: obscured,
                second_factor: otp.map(String::from),
            },
        );
        let fields = profile.config_fields(&self.config.two_factor_field);

        let created = match self
            .invoker
            .create_profile(&name, &self.config.backend_type, &fields)
            .await
        {
            Ok(out) if out.success => Ok(()),
            Ok(out) => Err(ControllerError::ConfigCreateFailed(scrub_secret(&out.diagnostic(), &password))),
            Err(e) => Err(ControllerError::from_tool(e, |d| {
                ControllerError::ConfigCreateFailed(scrub_secret(&d, &password))
            })),
        };
        if let Err(err) = created {
            return Err(self.fail_configure(err).await);
        }

        {
            let mut st = self.state.write().await;
            st.stored_user = Some(email.to_string());
            st.last_profile = Some(profile.clone());
        }
        self.transition_to(LifecycleState::ConfiguredUntested).await;
        self.activity
            .record(Severity::Success, format!("Remote '{}' created for {}", name, email))
            .await;

        if let Err(e) = self.run_probe(ProbeOrigin::Configure).await {
            debug!("Connection test after configure failed: {}", e);
        }
        Ok(profile)
    }

    async fn obscure(&self, password: &str) -> Result<String> {
        let out = self
            .invoker
            .obscure_secret(password)
            .await
            .map_err(|e| ControllerError::from_tool(e, |d| ControllerError::ObscureFailed(scrub_secret(&d, password))))?;
        if !out.success {
            return Err(ControllerError::ObscureFailed(scrub_secret(&out.diagnostic(), password)));
        }
        match first_line(&out.stdout) {
            Some(obscured) if obscured != password => Ok(obscured.to_string()),
            Some(_) => Err(ControllerError::ObscureFailed("rclone returned the password unchanged".into())),
            None => Err(ControllerError::ObscureFailed("rclone obscure produced no output".into())),
        }
    }

    async fn fail_configure(&self, err: ControllerError) -> ControllerError {
        self.transition_to(LifecycleState::ConfigFailed(err.diagnostic())).await;
        self.activity.record(Severity::Error, err.to_string()).await;
        err
    }

    /// List the remote root. Updates the connection status.
    pub async fn probe(&self) -> Result<DirectoryListing> {
        self.run_probe(ProbeOrigin::Explicit).await
    }

    pub(crate) async fn run_probe(&self, origin: ProbeOrigin) -> Result<DirectoryListing> {
        let ticket = self.probe_tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let root = self.remote_root();
        debug!("Probe #{} of {} ({:?})", ticket, root, origin);

        let limit = self.config.probe_timeout();
        let result = match tokio::time::timeout(limit, self.invoker.list_directory(&root)).await {
            Err(_) => Err(ControllerError::ProbeFailed(format!(
                "listing {} timed out after {}s",
                root,
                limit.as_secs_f32()
            ))),
            Ok(Err(e)) => Err(ControllerError::from_tool(e, probe_error)),
            Ok(Ok(out)) if out.success => Ok(DirectoryListing::parse(root.clone(), &out.stdout)),
            Ok(Ok(out)) => Err(probe_error(out.diagnostic())),
        };

        let transition = self.state.write().await.apply_probe(ticket, origin, &result);
        match transition {
            Some(t) => self.report_probe(origin, &t, &result).await,
            None => debug!("Probe #{} result superseded", ticket),
        }
        result
    }

    async fn report_probe(&self, origin: ProbeOrigin, t: &Transition, result: &Result<DirectoryListing>) {
        if t.changed() {
            self.publish_status(t).await;
        }
        let name = &self.config.remote_name;
        let quiet = origin == ProbeOrigin::Background && !t.status_changed();
        if quiet {
            return;
        }

        match result {
            Ok(listing) => {
                self.event_bus().publish(ControllerEvent::Listing(listing.clone())).await;
                self.activity
                    .record(Severity::Success, format!("Connected to {}", listing.summary()))
                    .await;
            }
            Err(err) => {
                if t.previous_status == ConnectionStatus::Connected {
                    self.activity
                        .record(Severity::Warning, format!("Lost connection to {}: {}", name, err.diagnostic()))
                        .await;
                } else {
                    self.activity
                        .record(Severity::Error, format!("Connection test failed: {}", err.diagnostic()))
                        .await;
                }
                if err.is_two_factor() {
                    self.activity.record(Severity::Warning, FRESH_CODE_HINT).await;
                }
            }
        }
    }

    /// Browse a folder of the remote. Leaves the connection status alone.
    pub async fn list_remote_folder(&self, path: &str) -> Result<DirectoryListing> {
        let remote = remote_path(&self.config.remote_name, path);
        let out = match self.invoker.list_directory(&remote).await {
            Ok(out) if out.success => out,
            Ok(out) => {
                let err = probe_error(out.diagnostic());
                self.activity
                    .record(Severity::Error, format!("Could not list {}: {}", remote, err.diagnostic()))
                    .await;
                return Err(err);
            }
            Err(e) => {
                let err = ControllerError::from_tool(e, probe_error);
                self.activity
                    .record(Severity::Error, format!("Could not list {}: {}", remote, err.diagnostic()))
                    .await;
                return Err(err);
            }
        };

        let listing = DirectoryListing::parse(remote, &out.stdout);
        self.event_bus().publish(ControllerEvent::Listing(listing.clone())).await;
        self.activity.record(Severity::Info, listing.summary()).await;
        Ok(listing)
    }

    /// Start `rclone sync` from `local_path` into `remote_subpath` (empty
    /// means the remote root).
    pub async fn sync_local_to_remote(&self, local_path: &Path, remote_subpath: &str) -> Result<SyncProgress> {
        if !local_path.is_dir() {
            return Err(ControllerError::InvalidInput(format!(
                "{} is not a directory",
                local_path.display()
            )));
        }
        let remote = remote_path(&self.config.remote_name, remote_subpath);
        self.activity
            .record(Severity::Info, format!("Syncing {} to {}", local_path.display(), remote))
            .await;

        let stream = match self.invoker.sync(local_path, &remote, &self.config.sync_args).await {
            Ok(stream) => stream,
            Err(e) => {
                let err = ControllerError::from_tool(e, |diagnostic| ControllerError::SyncFailed {
                    partial: false,
                    diagnostic,
                });
                self.activity.record(Severity::Error, err.to_string()).await;
                return Err(err);
            }
        };
        Ok(SyncProgress::new(stream, remote, self.activity.clone()))
    }

    /// Start `rclone mount` of the remote root on `mount_point` and wait for
    /// the settle window. A process that fails inside the window is a
    /// `MountFailed` carrying its output.
    pub async fn mount(&self, mount_point: &Path) -> Result<MountHandle> {
        if !mount_point.is_dir() {
            return Err(ControllerError::InvalidInput(format!(
                "mount point {} is not a directory",
                mount_point.display()
            )));
        }
        let root = self.remote_root();
        self.activity
            .record(Severity::Info, format!("Mounting {} on {}", root, mount_point.display()))
            .await;

        let mut stream = match self.invoker.mount(&root, mount_point, &self.config.mount_args).await {
            Ok(stream) => stream,
            Err(e) => {
                let err = ControllerError::from_tool(e, ControllerError::MountFailed);
                self.activity.record(Severity::Error, err.to_string()).await;
                return Err(err);
            }
        };

        let mut startup = Vec::new();
        let mut exit = None;
        let settle = tokio::time::sleep(self.config.mount_settle());
        tokio::pin!(settle);
        loop {
            tokio::select! {
                _ = &mut settle => break,
                line = stream.next_line() => match line {
                    Some(ToolLine::Output(text)) => startup.push(text),
                    Some(ToolLine::Exit { success, code }) => {
                        exit = Some((success, code));
                        break;
                    }
                    None => {
                        exit = Some((false, None));
                        break;
                    }
                },
            }
        }

        match exit {
            Some((false, code)) => {
                let diagnostic = if startup.is_empty() {
                    match code {
                        Some(code) => format!("rclone mount exited with code {}", code),
                        None => "rclone mount was terminated".to_string(),
                    }
                } else {
                    startup.join("\n")
                };
                let err = ControllerError::MountFailed(diagnostic);
                self.activity.record(Severity::Error, err.to_string()).await;
                Err(err)
            }
            Some((true, _)) => {
                info!("rclone mount of {} returned immediately", root);
                self.activity
                    .record(Severity::Success, format!("Mounted {} on {}", root, mount_point.display()))
                    .await;
                Ok(MountHandle::new(mount_point, root, stream, startup, false, self.activity.clone()))
            }
            None => {
                self.activity
                    .record(Severity::Success, format!("Mounted {} on {}", root, mount_point.display()))
                    .await;
                Ok(MountHandle::new(mount_point, root, stream, startup, true, self.activity.clone()))
            }
        }
    }

    /// The stored profile as rclone prints it, minus every secret line.
    pub async fn show_profile_redacted(&self) -> Result<String> {
        let name = &self.config.remote_name;
        let out = self
            .invoker
            .show_profile(name)
            .await
            .map_err(|e| ControllerError::from_tool(e, ControllerError::ProbeFailed))?;
        if !out.success {
            return Err(ControllerError::ProbeFailed(out.diagnostic()));
        }
        Ok(redact_profile_text(&out.stdout))
    }

    /// Polls only run while a profile exists and no configure is running.
    pub async fn should_poll(&self) -> bool {
        self.state.read().await.lifecycle.has_profile()
    }

    /// One background probe, or `None` when there is nothing to poll.
    pub async fn poll_once(&self) -> Option<Result<DirectoryListing>> {
        if !self.should_poll().await {
            return None;
        }
        Some(self.run_probe(ProbeOrigin::Background).await)
    }

    /// Start the periodic status poll at the configured interval.
    pub fn start_polling(self: &Arc<Self>) -> StatusPollHandle {
        spawn_status_poll_task(self.clone(), self.config.poll_interval())
    }

    async fn transition_to(&self, lifecycle: LifecycleState) {
        let t = self.state.write().await.set_lifecycle(lifecycle);
        if t.changed() {
            self.publish_status(&t).await;
        }
    }

    async fn publish_status(&self, t: &Transition) {
        info!("{}: {} ({})", self.config.remote_name, t.lifecycle, t.status);
        self.event_bus()
            .publish(ControllerEvent::StatusChanged {
                status: t.status,
                state: t.lifecycle.clone(),
            })
            .await;
    }
}
