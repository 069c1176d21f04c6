pub mod activity;
pub mod listing;
pub mod profile;
pub mod status;
pub mod sync;

pub use activity::{ActivityEvent, Severity};
pub use listing::DirectoryListing;
pub use profile::{remote_path, remote_root, RemoteCredentials, RemoteProfile};
pub use status::{ConnectionStatus, LifecycleState};
pub use sync::{classify_sync_line, is_transfer_line, SyncProgressLine, SyncSummary};

// The rclone-level value types travel through the invoker seam unchanged.
pub use protondrive_rclone::{DirectoryEntry, ToolLine, ToolOutput, ToolStream};
