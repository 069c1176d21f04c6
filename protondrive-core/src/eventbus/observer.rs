//! src/eventbus/observer.rs
//!
//! Spawns a task that subscribes to the EventBus and hands every event to a
//! `ControllerObserver`. Drains the queue on shutdown so nothing published
//! before the shutdown is lost.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use protondrive_common::traits::ControllerObserver;

use crate::eventbus::{ControllerEvent, EventBus};

pub async fn spawn_observer_task(
    event_bus: &EventBus,
    observer: Arc<dyn ControllerObserver>,
    buffer_size: Option<usize>,
) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe(buffer_size).await;
    let mut shutdown_rx = event_bus.shutdown_rx.clone();

    tokio::spawn(async move {
        debug!("Observer task started");

        loop {
            tokio::select! {
                biased;
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => dispatch(observer.as_ref(), &event),
                        None => {
                            debug!("Observer channel closed => break from loop.");
                            break;
                        }
                    }
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Observer task shutting down.");
                        break;
                    }
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            dispatch(observer.as_ref(), &event);
        }
    })
}

fn dispatch(observer: &dyn ControllerObserver, event: &ControllerEvent) {
    match event {
        ControllerEvent::StatusChanged { status, state } => observer.on_status_changed(*status, state),
        ControllerEvent::Activity(activity) => observer.on_activity(activity),
        ControllerEvent::Listing(listing) => observer.on_listing(listing),
    }
}
