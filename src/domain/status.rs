use std::time::{SystemTime, UNIX_EPOCH};

use super::user::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub code: String,
    pub at_unix_ms: u128,
}

/// Identity and presence state republished by the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub current_user: Option<User>,
    pub online: bool,
    /// True while a login round-trip is outstanding.
    pub loading: bool,
    pub updated_at_unix_ms: u128,
    pub last_error: Option<StatusError>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            current_user: None,
            online: false,
            loading: false,
            updated_at_unix_ms: now_unix_ms(),
            last_error: None,
        }
    }
}

pub fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
