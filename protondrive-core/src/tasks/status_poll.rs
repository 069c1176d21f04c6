// src/tasks/status_poll.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::controller::ConnectionController;

/// Running status poll. Stopping it waits for an in-flight probe to finish.
pub struct StatusPollHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl StatusPollHandle {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            error!("Status poll task ended abnormally: {:?}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawns a background task that re-probes the remote every `period` while
/// a profile exists. Ends on `stop()` or when the controller's event bus
/// shuts down.
pub fn spawn_status_poll_task(controller: Arc<ConnectionController>, period: Duration) -> StatusPollHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut bus_shutdown = controller.event_bus().shutdown_rx.clone();

    let join = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the state is already fresh.
        interval.tick().await;
        info!("Status poll started ({:?})", period);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match controller.poll_once().await {
                        Some(Ok(listing)) => debug!("Status poll ok: {} entries", listing.entries.len()),
                        Some(Err(e)) => debug!("Status poll failed: {}", e),
                        None => debug!("Status poll skipped, no profile"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                changed = bus_shutdown.changed() => {
                    if changed.is_err() || *bus_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Status poll stopped");
    });

    StatusPollHandle { shutdown_tx, join }
}
