use std::{sync::Arc, time::Duration};

use crate::{
    domain::{
        channel::{self, Channel},
        message::Message,
        user::User,
    },
    usecases::{
        contracts::{ChannelFilter, ChatBackend},
        pagination::PaginationCursor,
        session::SessionController,
    },
};

/// Channel, user and history listings plus per-user channel presentation.
///
/// Derivations are recomputed on every call; the backend stays authoritative.
#[derive(Clone)]
pub struct ChannelDirectory {
    backend: Arc<dyn ChatBackend>,
    session: SessionController,
    timeout: Duration,
}

impl ChannelDirectory {
    pub fn new(backend: Arc<dyn ChatBackend>, session: SessionController, timeout: Duration) -> Self {
        Self {
            backend,
            session,
            timeout,
        }
    }

    pub fn joined_channels(&self) -> PaginationCursor<Channel> {
        self.channels(ChannelFilter::joined())
    }

    pub fn users(&self) -> PaginationCursor<User> {
        let backend = Arc::clone(&self.backend);
        PaginationCursor::new(move || {
            let backend = Arc::clone(&backend);
            async move { backend.get_users().await }
        })
        .with_timeout(self.timeout)
    }

    /// Message history; available whether or not a live session is bound.
    pub fn messages(&self, channel: &Channel) -> PaginationCursor<Message> {
        let backend = Arc::clone(&self.backend);
        let channel = channel.clone();
        PaginationCursor::new(move || {
            let backend = Arc::clone(&backend);
            let channel = channel.clone();
            async move { backend.get_messages(&channel).await }
        })
        .with_timeout(self.timeout)
    }

    pub fn display_name(&self, channel: &Channel) -> String {
        channel::display_name(channel, self.session.current_user().as_ref())
    }

    pub fn display_picture(&self, channel: &Channel) -> Option<String> {
        channel::display_picture(channel, self.session.current_user().as_ref())
    }

    fn channels(&self, filter: ChannelFilter) -> PaginationCursor<Channel> {
        let backend = Arc::clone(&self.backend);
        PaginationCursor::new(move || {
            let backend = Arc::clone(&backend);
            async move { backend.get_channels(filter).await }
        })
        .with_timeout(self.timeout)
    }
}
