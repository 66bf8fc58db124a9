use chrono::{DateTime, Utc};

use super::{channel::ChannelId, user::User};

pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// `None` for system messages.
    pub sender: Option<User>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn sender_display_name(&self) -> &str {
        self.sender
            .as_ref()
            .map(|sender| sender.display_name.as_str())
            .unwrap_or("system")
    }
}
