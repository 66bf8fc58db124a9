use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    backend::live_session::LiveSession,
    domain::{channel::Channel, chat_session::ChatSession, message::Message},
    usecases::contracts::ChatBackend,
};

const CHAT_SESSION_START_FAILED: &str = "CHAT_SESSION_START_FAILED";
const CHAT_SESSION_SUPERSEDED: &str = "CHAT_SESSION_SUPERSEDED";

#[derive(Default)]
struct ConversationState {
    /// Channel the user is looking at; drafts belong to it.
    channel: Option<Channel>,
    /// Bumped whenever `channel` changes to a different channel.
    generation: u64,
    live: Option<LiveSession>,
}

impl ConversationState {
    fn retarget(&mut self, channel: Option<Channel>) {
        let changed = self.channel.as_ref().map(|c| c.id) != channel.as_ref().map(|c| c.id);
        if changed {
            self.generation += 1;
        }
        self.channel = channel;
    }
}

/// The active channel together with the generation it was selected in.
///
/// Two selections of the same channel separated by a switch elsewhere carry
/// different generations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub channel: Option<Channel>,
    pub generation: u64,
}

/// Binds the client to at most one channel for live message exchange.
#[derive(Clone)]
pub struct ChatSessionController {
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<ConversationState>>,
}

impl ChatSessionController {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(ConversationState::default())),
        }
    }

    /// Starts a live session on `channel`, superseding the active one.
    ///
    /// On failure `None` is returned and the active session is left running.
    pub fn start<F>(&self, channel: &Channel, on_received_message: F) -> Option<ChatSession>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let live = match self
            .backend
            .start_chat_session(channel, Arc::new(on_received_message))
        {
            Ok(live) => live,
            Err(error) => {
                tracing::warn!(
                    code = CHAT_SESSION_START_FAILED,
                    channel_id = channel.id,
                    error_code = error.code(),
                    error = %error,
                    "chat session start failed; keeping previous session"
                );
                return None;
            }
        };

        let descriptor = live.descriptor().clone();
        let previous = {
            let mut state = self.state();
            state.retarget(Some(live.channel().clone()));
            state.live.replace(live)
        };

        if let Some(previous) = previous {
            tracing::info!(
                code = CHAT_SESSION_SUPERSEDED,
                previous_session = previous.descriptor().id,
                previous_channel = previous.channel().id,
                session = descriptor.id,
                channel_id = descriptor.channel.id,
                "chat session superseded"
            );
            previous.end();
        }

        Some(descriptor)
    }

    /// Ends the active session. Returns `false` when none was active.
    pub fn end(&self) -> bool {
        let live = self.state().live.take();
        match live {
            Some(live) => {
                tracing::debug!(session = live.descriptor().id, "chat session ended");
                live.end();
                true
            }
            None => false,
        }
    }

    /// Ends the live session and clears the active channel.
    pub fn reset(&self) {
        let live = {
            let mut state = self.state();
            state.retarget(None);
            state.live.take()
        };
        if let Some(live) = live {
            tracing::debug!(session = live.descriptor().id, "chat session reset");
            live.end();
        }
    }

    /// Makes `channel` the active conversation without touching the live session.
    pub fn select(&self, channel: Channel) {
        self.state().retarget(Some(channel));
    }

    pub fn selection(&self) -> Selection {
        let state = self.state();
        Selection {
            channel: state.channel.clone(),
            generation: state.generation,
        }
    }

    pub fn active(&self) -> Option<ChatSession> {
        self.state()
            .live
            .as_ref()
            .map(|live| live.descriptor().clone())
    }

    pub fn active_channel(&self) -> Option<Channel> {
        self.state().channel.clone()
    }

    /// Whether the live session is bound to `channel`.
    pub fn is_selected(&self, channel: &Channel) -> bool {
        self.state()
            .live
            .as_ref()
            .is_some_and(|live| live.channel().id == channel.id)
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
