use super::user::User;

/// Identity and presence notifications pushed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    CurrentUserChanged(Option<User>),
    CurrentUserOnline,
    CurrentUserOffline,
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CurrentUserChanged(Some(_)) => "current_user_changed",
            Self::CurrentUserChanged(None) => "current_user_cleared",
            Self::CurrentUserOnline => "current_user_online",
            Self::CurrentUserOffline => "current_user_offline",
        }
    }
}
