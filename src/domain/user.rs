pub type UserId = i64;

/// A chat participant as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Login name used to start a session.
    pub name: String,
    pub display_name: String,
    /// Reference (usually a URL) to the user's display picture.
    pub display_picture: String,
}

impl User {
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        display_picture: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: display_name.into(),
            display_picture: display_picture.into(),
        }
    }
}

/// Credentials handed to the backend when starting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

impl Identity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}
