use std::{fmt, sync::Arc};

use crate::domain::{
    channel::Channel,
    chat_session::{ChatSession, SessionId},
    message::Message,
};

/// Callback the backend invokes for every message received on a live session.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// Owning handle of a live chat session; ending or dropping it stops delivery.
pub struct LiveSession {
    descriptor: ChatSession,
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl LiveSession {
    pub fn new<F>(id: SessionId, channel: Channel, closer: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            descriptor: ChatSession { id, channel },
            closer: Some(Box::new(closer)),
        }
    }

    pub fn descriptor(&self) -> &ChatSession {
        &self.descriptor
    }

    pub fn channel(&self) -> &Channel {
        &self.descriptor.channel
    }

    pub fn end(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.descriptor.id)
            .field("channel_id", &self.descriptor.channel.id)
            .field("open", &self.closer.is_some())
            .finish()
    }
}
