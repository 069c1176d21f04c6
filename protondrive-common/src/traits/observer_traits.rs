use crate::models::{ActivityEvent, ConnectionStatus, DirectoryListing, LifecycleState};

/// Presentation-side callbacks. They are invoked from the observer's own
/// task, never from a controller worker.
pub trait ControllerObserver: Send + Sync {
    fn on_status_changed(&self, status: ConnectionStatus, state: &LifecycleState);

    fn on_activity(&self, event: &ActivityEvent);

    fn on_listing(&self, _listing: &DirectoryListing) {}
}
