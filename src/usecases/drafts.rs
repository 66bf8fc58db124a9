//! Compose-draft state for the active conversation.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::{
    backend::{error::BackendError, timeout::with_timeout},
    domain::{
        channel::{Channel, ChannelId},
        draft::MessageDraft,
        message::Message,
    },
    usecases::{
        contracts::ChatBackend,
        conversation::{ChatSessionController, Selection},
    },
};

const DRAFT_KEYSTROKES_FAILED: &str = "DRAFT_KEYSTROKES_FAILED";
const DRAFT_SEND_FAILED: &str = "DRAFT_SEND_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(Message),
    /// The draft is kept so the user can retry.
    Failed(BackendError),
    NoActiveChannel,
}

#[derive(Default)]
struct DraftState {
    /// Selection generation the draft was composed in.
    generation: u64,
    draft: MessageDraft,
    last_keystrokes: Option<(ChannelId, Instant)>,
}

impl DraftState {
    /// Drops a draft composed before the latest channel switch.
    fn align(&mut self, generation: u64) {
        if self.generation != generation {
            self.generation = generation;
            self.draft = MessageDraft::default();
        }
    }
}

#[derive(Clone)]
pub struct DraftSynchronizer {
    backend: Arc<dyn ChatBackend>,
    conversation: ChatSessionController,
    state: Arc<Mutex<DraftState>>,
    keystroke_interval: Duration,
    timeout: Duration,
}

impl DraftSynchronizer {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        conversation: ChatSessionController,
        keystroke_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            conversation,
            state: Arc::new(Mutex::new(DraftState::default())),
            keystroke_interval,
            timeout,
        }
    }

    /// Draft of the active channel; empty after a channel switch.
    pub fn current(&self) -> MessageDraft {
        let generation = self.conversation.selection().generation;
        let mut state = self.state();
        state.align(generation);
        state.draft.clone()
    }

    /// Forwards a typing signal for the edit, then stores the draft.
    ///
    /// Returns `false` without effect when no channel is active, and drops the
    /// edit if the active channel changed while the signal was in flight.
    pub async fn update(&self, draft: MessageDraft) -> bool {
        let Selection {
            channel: Some(channel),
            generation,
        } = self.conversation.selection()
        else {
            return false;
        };

        if self.claim_keystroke_slot(channel.id) {
            self.forward_keystrokes(&channel, &draft).await;
        }

        let current = self.conversation.selection().generation;
        let mut state = self.state();
        state.align(current);
        if current != generation {
            return false;
        }
        state.draft = draft;
        true
    }

    pub fn discard(&self) {
        self.state().draft = MessageDraft::default();
    }

    /// Sends a text draft to the active channel and clears it once delivered.
    pub async fn send(&self, draft: MessageDraft) -> SendOutcome {
        let Selection {
            channel: Some(channel),
            generation,
        } = self.conversation.selection()
        else {
            return SendOutcome::NoActiveChannel;
        };

        match draft {
            MessageDraft::Text { text } => {
                let result =
                    with_timeout(self.timeout, self.backend.send_message(&channel, &text)).await;
                match result {
                    Ok(message) => {
                        self.discard_for(generation);
                        SendOutcome::Sent(message)
                    }
                    Err(error) => {
                        tracing::warn!(
                            code = DRAFT_SEND_FAILED,
                            channel_id = channel.id,
                            error_code = error.code(),
                            error = %error,
                            "message send failed; draft retained"
                        );
                        SendOutcome::Failed(error)
                    }
                }
            }
        }
    }

    async fn forward_keystrokes(&self, channel: &Channel, draft: &MessageDraft) {
        let keys = draft.as_text();
        if let Err(error) =
            with_timeout(self.timeout, self.backend.send_keystrokes(channel, keys)).await
        {
            tracing::debug!(
                code = DRAFT_KEYSTROKES_FAILED,
                channel_id = channel.id,
                error_code = error.code(),
                "typing signal dropped"
            );
        }
    }

    fn claim_keystroke_slot(&self, channel_id: ChannelId) -> bool {
        if self.keystroke_interval.is_zero() {
            return true;
        }

        let now = Instant::now();
        let mut state = self.state();
        let throttled = matches!(
            state.last_keystrokes,
            Some((last_channel, at))
                if last_channel == channel_id && now.duration_since(at) < self.keystroke_interval
        );
        if !throttled {
            state.last_keystrokes = Some((channel_id, now));
        }
        !throttled
    }

    /// Clears the draft unless the channel was switched since `generation`.
    fn discard_for(&self, generation: u64) {
        let current = self.conversation.selection().generation;
        let mut state = self.state();
        state.align(current);
        if current == generation {
            state.draft = MessageDraft::default();
        }
    }

    fn state(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
