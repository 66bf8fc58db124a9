//! Domain layer: chat entities and the pure rules derived from them.

pub mod channel;
pub mod chat_session;
pub mod draft;
pub mod events;
pub mod layout;
pub mod message;
pub mod status;
pub mod user;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
