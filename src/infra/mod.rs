//! Infrastructure layer: config, logging, and backend seed data.

pub mod config;
pub mod contracts;
pub mod error;
pub mod fixture;
pub mod logging;

/// Returns the infra module name for smoke checks.
pub fn module_name() -> &'static str {
    "infra"
}
