use super::channel::{Channel, ChannelId};

pub type SessionId = u64;

/// Descriptor of a live chat session handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: SessionId,
    pub channel: Channel,
}

impl ChatSession {
    pub fn channel_id(&self) -> ChannelId {
        self.channel.id
    }
}
