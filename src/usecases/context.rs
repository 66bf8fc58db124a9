use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{
    domain::{
        channel::{Channel, ChannelSummary},
        chat_session::ChatSession,
        draft::MessageDraft,
        layout::LayoutState,
        message::Message,
        status::{SessionSnapshot, StatusError},
        user::{Identity, User},
    },
    infra::{config::AppConfig, error::AppError},
    usecases::{
        channels::ChannelDirectory,
        contracts::ChatBackend,
        conversation::ChatSessionController,
        drafts::{DraftSynchronizer, SendOutcome},
        layout::LayoutCoordinator,
        pagination::PaginationCursor,
        session::SessionController,
        unread::UnreadCounter,
    },
};

const CHAT_APP_INIT: &str = "CHAT_APP_INIT";
const CHAT_APP_SHUTDOWN: &str = "CHAT_APP_SHUTDOWN";

/// Read-only state the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSnapshot {
    pub current_user: Option<User>,
    pub online: bool,
    pub loading: bool,
    pub layout: LayoutState,
    pub channel: Option<Channel>,
    pub draft: MessageDraft,
    pub last_error: Option<StatusError>,
}

/// Context object shared with the presentation layer.
///
/// Every component is built around one backend handle. Cloning is cheap and
/// clones observe the same state.
#[derive(Clone)]
pub struct ChatApp {
    session: SessionController,
    directory: ChannelDirectory,
    conversation: ChatSessionController,
    unread: UnreadCounter,
    drafts: DraftSynchronizer,
    layout: LayoutCoordinator,
}

impl ChatApp {
    /// Wires the components and subscribes to backend session events.
    ///
    /// Fails with [`AppError::NoRuntime`] outside a tokio runtime.
    pub fn init(backend: Arc<dyn ChatBackend>, config: &AppConfig) -> Result<Self, AppError> {
        let timeout = config.backend.request_timeout();
        let session = SessionController::new(Arc::clone(&backend), timeout);
        let conversation = ChatSessionController::new(Arc::clone(&backend));
        let app = Self {
            directory: ChannelDirectory::new(Arc::clone(&backend), session.clone(), timeout),
            unread: UnreadCounter::new(Arc::clone(&backend), timeout),
            drafts: DraftSynchronizer::new(
                Arc::clone(&backend),
                conversation.clone(),
                config.drafts.keystroke_interval(),
                timeout,
            ),
            session,
            conversation,
            layout: LayoutCoordinator::new(),
        };

        app.session.attach().map_err(AppError::NoRuntime)?;
        tracing::debug!(
            code = CHAT_APP_INIT,
            request_timeout_ms = config.backend.request_timeout_ms,
            "chat app initialized"
        );
        Ok(app)
    }

    /// Ends the live chat session and the backend session, then stops
    /// listening for session events.
    pub async fn shutdown(&self) {
        self.conversation.reset();
        if self.session.current_user().is_some() {
            self.session.logout().await;
        }
        self.session.detach();
        tracing::debug!(code = CHAT_APP_SHUTDOWN, "chat app shut down");
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let SessionSnapshot {
            current_user,
            online,
            loading,
            last_error,
            ..
        } = self.session.snapshot();

        AppSnapshot {
            current_user,
            online,
            loading,
            layout: self.layout.layout(),
            channel: self.conversation.active_channel(),
            draft: self.drafts.current(),
            last_error,
        }
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub async fn login(&self, identity: Identity) {
        self.session.login(identity).await;
    }

    /// Closes the conversation and asks the backend to end the session.
    pub async fn logout(&self) {
        self.conversation.reset();
        self.session.logout().await;
    }

    /// Waits for the backend to report the signed-in user.
    pub async fn wait_for_user(&self, timeout: Duration) -> Option<User> {
        self.session.wait_for_user(timeout).await
    }

    pub fn users(&self) -> PaginationCursor<User> {
        self.directory.users()
    }

    pub fn joined_channels(&self) -> PaginationCursor<Channel> {
        self.directory.joined_channels()
    }

    pub fn channel_display_name(&self, channel: &Channel) -> String {
        self.directory.display_name(channel)
    }

    pub fn channel_display_picture(&self, channel: &Channel) -> Option<String> {
        self.directory.display_picture(channel)
    }

    pub async fn channel_unread_messages_count(&self, channel: &Channel) -> u64 {
        self.unread.count(channel).await
    }

    pub fn channel_messages(&self, channel: &Channel) -> PaginationCursor<Message> {
        self.directory.messages(channel)
    }

    /// Everything a channel list row shows for `channel`.
    pub async fn channel_summary(&self, channel: &Channel) -> ChannelSummary {
        ChannelSummary {
            channel_id: channel.id,
            display_name: self.directory.display_name(channel),
            display_picture: self.directory.display_picture(channel),
            unread_count: self.unread.count(channel).await,
            is_selected: self.conversation.is_selected(channel),
        }
    }

    pub fn start_chat_session<F>(&self, channel: &Channel, on_received_message: F) -> Option<ChatSession>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.conversation.start(channel, on_received_message)
    }

    pub fn end_chat_session(&self) -> bool {
        self.conversation.end()
    }

    pub fn active_chat_session(&self) -> Option<ChatSession> {
        self.conversation.active()
    }

    pub async fn update_message_draft(&self, draft: MessageDraft) -> bool {
        self.drafts.update(draft).await
    }

    pub fn discard_message_draft(&self) {
        self.drafts.discard();
    }

    pub async fn send_message_draft(&self, draft: MessageDraft) -> SendOutcome {
        self.drafts.send(draft).await
    }

    pub fn show_menu(&self) {
        self.layout.show_menu();
    }

    pub fn hide_menu(&self) {
        self.layout.hide_menu();
    }

    /// Opens `channel` as the active conversation.
    pub fn show_channel(&self, channel: &Channel) {
        self.layout.hide_menu();
        self.conversation.select(channel.clone());
        self.layout.show_chat();
    }
}
