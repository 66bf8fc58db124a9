//! Backend layer: the remote chat service seam and its in-process implementation.

pub mod error;
pub mod events_monitor;
pub mod live_session;
pub mod memory;
pub mod page;
pub mod timeout;

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
