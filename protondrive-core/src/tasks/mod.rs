pub mod status_poll;

pub use status_poll::{spawn_status_poll_task, StatusPollHandle};
