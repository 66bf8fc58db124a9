use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::{
    backend::{
        error::BackendResult,
        live_session::{LiveSession, MessageHandler},
        page::PageBox,
    },
    domain::{
        channel::Channel,
        events::SessionEvent,
        message::Message,
        user::{Identity, User},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFilter {
    pub joined: bool,
}

impl ChannelFilter {
    pub fn joined() -> Self {
        Self { joined: true }
    }

    pub fn joinable() -> Self {
        Self { joined: false }
    }
}

/// Remote chat service consumed by every orchestration component.
///
/// One handle is shared by all components; only the session controller
/// subscribes to its event stream.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn start_session(&self, identity: &Identity) -> BackendResult<()>;

    async fn end_session(&self) -> BackendResult<()>;

    async fn get_users(&self) -> BackendResult<PageBox<User>>;

    async fn get_channels(&self, filter: ChannelFilter) -> BackendResult<PageBox<Channel>>;

    async fn get_messages(&self, channel: &Channel) -> BackendResult<PageBox<Message>>;

    async fn get_unread_messages_count(&self, channel: &Channel) -> BackendResult<u64>;

    async fn send_keystrokes(&self, channel: &Channel, keys: &str) -> BackendResult<()>;

    async fn send_message(&self, channel: &Channel, body: &str) -> BackendResult<Message>;

    /// Binds `channel` for live delivery. Local and synchronous; the
    /// connection itself is managed by the backend.
    fn start_chat_session(
        &self,
        channel: &Channel,
        on_received_message: MessageHandler,
    ) -> BackendResult<LiveSession>;

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
