// protondrive-cli/src/console.rs

use protondrive_common::models::{ActivityEvent, ConnectionStatus, LifecycleState, Severity};
use protondrive_common::traits::ControllerObserver;

/// Prints controller events to stdout, one line each.
#[derive(Default)]
pub struct ConsoleObserver;

fn prefix(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "  ",
        Severity::Success => "OK",
        Severity::Warning => "!!",
        Severity::Error => "XX",
    }
}

pub fn format_activity(event: &ActivityEvent) -> String {
    format!(
        "{} [{}] {}",
        event.timestamp.format("%H:%M:%S"),
        prefix(event.severity),
        event.message
    )
}

impl ControllerObserver for ConsoleObserver {
    fn on_status_changed(&self, status: ConnectionStatus, state: &LifecycleState) {
        println!("Status: {} ({})", state, status);
    }

    fn on_activity(&self, event: &ActivityEvent) {
        println!("{}", format_activity(event));
    }
}
