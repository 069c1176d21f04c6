//! src/eventbus/mod.rs
//!
//! In-process event bus carrying controller events to any number of
//! subscribers via bounded MPSC queues. Workers publish here instead of
//! touching presentation state; observers drain their queue on their own task.

pub mod observer;

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};

use protondrive_common::models::{
    ActivityEvent, ConnectionStatus, DirectoryListing, LifecycleState, Severity,
};

pub use observer::spawn_observer_task;

/// Everything the controller reports to the outside.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Lifecycle state or connection status changed.
    StatusChanged {
        status: ConnectionStatus,
        state: LifecycleState,
    },

    Activity(ActivityEvent),

    /// A directory listing retrieved by a probe or a browse.
    Listing(DirectoryListing),
}

impl ControllerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ControllerEvent::StatusChanged { .. } => "status_changed",
            ControllerEvent::Activity(_) => "activity",
            ControllerEvent::Listing(_) => "listing",
        }
    }

    pub fn as_activity(&self) -> Option<&ActivityEvent> {
        match self {
            ControllerEvent::Activity(a) => Some(a),
            _ => None,
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<ControllerEvent>`.
///
/// - If a subscriber's buffer fills, `publish` waits until there's space.
/// - Subscribers that dropped their `Receiver` are pruned on the next publish.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<ControllerEvent>>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<ControllerEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE).max(1);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: ControllerEvent) {
        let senders = {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Numbers activity events and mirrors them into the tracing log.
///
/// Numbering and delivery happen under one lock, so observers always see
/// `seq` strictly increasing.
#[derive(Clone)]
pub struct ActivityLog {
    bus: EventBus,
    seq: Arc<Mutex<u64>>,
}

impl ActivityLog {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            seq: Arc::new(Mutex::new(0)),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn record(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        let mut seq = self.seq.lock().await;
        *seq += 1;
        match severity {
            Severity::Info | Severity::Success => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
        let event = ActivityEvent::new(*seq, severity, message);
        self.bus.publish(ControllerEvent::Activity(event)).await;
    }
}
