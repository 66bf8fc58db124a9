//! Use case layer: session, conversation and draft orchestration.

pub mod bootstrap;
pub mod channels;
pub mod context;
pub mod contracts;
pub mod conversation;
pub mod drafts;
pub mod layout;
pub mod pagination;
pub mod session;
pub mod unread;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
