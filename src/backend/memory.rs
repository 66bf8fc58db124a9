//! In-process chat backend.
//!
//! Holds users, channels and message history in memory, delivers sent
//! messages to live sessions and emits identity/presence events. Used by the
//! command-line binary and as the fake backend of the test suite.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::{
    backend::{
        error::{BackendError, BackendResult},
        live_session::{LiveSession, MessageHandler},
        page::{PageBox, RemotePage},
    },
    domain::{
        channel::{Channel, ChannelId},
        chat_session::SessionId,
        events::SessionEvent,
        message::{Message, MessageId},
        user::{Identity, User, UserId},
    },
    usecases::contracts::{ChannelFilter, ChatBackend},
};

const DEFAULT_PAGE_SIZE: usize = 25;
const EVENT_BUFFER: usize = 64;

/// Backend operations that can be made to fail once through [`InMemoryBackend::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartSession,
    EndSession,
    GetUsers,
    GetChannels,
    GetMessages,
    GetUnreadCount,
    SendKeystrokes,
    SendMessage,
    StartChatSession,
    NextPage,
}

#[derive(Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<SessionEvent>,
}

struct LiveBinding {
    channel_id: ChannelId,
    handler: MessageHandler,
}

struct MemoryState {
    users: Vec<User>,
    channels: Vec<Channel>,
    messages: Vec<Message>,
    read_marks: HashMap<(UserId, ChannelId), MessageId>,
    current_user: Option<User>,
    live_sessions: HashMap<SessionId, LiveBinding>,
    keystrokes: Vec<(ChannelId, String)>,
    faults: HashSet<Operation>,
    next_session_id: SessionId,
    next_message_id: MessageId,
    page_size: usize,
    latency: Duration,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl InMemoryBackend {
    pub fn new(page_size: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let state = MemoryState {
            users: Vec::new(),
            channels: Vec::new(),
            messages: Vec::new(),
            read_marks: HashMap::new(),
            current_user: None,
            live_sessions: HashMap::new(),
            keystrokes: Vec::new(),
            faults: HashSet::new(),
            next_session_id: 1,
            next_message_id: 1,
            page_size: page_size.max(1),
            latency: Duration::ZERO,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                events,
            }),
        }
    }

    pub fn add_user(&self, user: User) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.users.retain(|existing| existing.id != user.id);
            state.users.push(user);
        }
    }

    pub fn add_channel(&self, channel: Channel) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.channels.retain(|existing| existing.id != channel.id);
            state.channels.push(channel);
        }
    }

    /// Posts `body` to a channel on behalf of one of its members, delivering
    /// it to every live session bound to the channel.
    pub fn post_as(
        &self,
        sender_id: UserId,
        channel_id: ChannelId,
        body: &str,
    ) -> BackendResult<Message> {
        let (message, handlers) = {
            let mut state = self.shared.lock()?;
            let channel = state.channel(channel_id)?.clone();
            let sender = channel
                .members()
                .iter()
                .find(|member| member.id == sender_id)
                .cloned()
                .ok_or_else(|| BackendError::not_found(format!("member {sender_id}")))?;
            state.append_message(&channel, sender, body)
        };

        deliver(&message, handlers);
        Ok(message)
    }

    /// Makes the next call of `operation` fail with [`BackendError::Unavailable`].
    pub fn fail_next(&self, operation: Operation) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.faults.insert(operation);
        }
    }

    /// Delay applied to every asynchronous call.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.latency = latency;
        }
    }

    pub fn keystrokes(&self) -> Vec<(ChannelId, String)> {
        self.shared
            .state
            .lock()
            .map(|state| state.keystrokes.clone())
            .unwrap_or_default()
    }

    pub fn messages_in(&self, channel_id: ChannelId) -> Vec<Message> {
        self.shared
            .state
            .lock()
            .map(|state| state.channel_messages(channel_id))
            .unwrap_or_default()
    }

    pub fn live_session_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .map(|state| state.live_sessions.len())
            .unwrap_or_default()
    }

    pub fn event_subscriber_count(&self) -> usize {
        self.shared.events.receiver_count()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscriber is not an error.
        let _ = self.shared.events.send(event);
    }

    async fn begin(&self, operation: Operation) -> BackendResult<()> {
        self.shared.begin(operation).await
    }
}

impl Shared {
    fn lock(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::unavailable("backend state lock poisoned"))
    }

    async fn begin(&self, operation: Operation) -> BackendResult<()> {
        let latency = self.lock()?.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.lock()?.take_fault(operation)
    }
}

impl MemoryState {
    fn take_fault(&mut self, operation: Operation) -> BackendResult<()> {
        if self.faults.remove(&operation) {
            return Err(BackendError::unavailable(format!(
                "injected fault for {operation:?}"
            )));
        }
        Ok(())
    }

    fn require_user(&self) -> BackendResult<User> {
        self.current_user.clone().ok_or(BackendError::Unauthorized)
    }

    fn channel(&self, channel_id: ChannelId) -> BackendResult<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.id == channel_id)
            .ok_or_else(|| BackendError::not_found(format!("channel {channel_id}")))
    }

    fn joined_channel(&self, channel_id: ChannelId) -> BackendResult<(User, Channel)> {
        let user = self.require_user()?;
        let channel = self.channel(channel_id)?;
        if !channel.has_member(user.id) {
            return Err(BackendError::not_found(format!(
                "channel {channel_id} for user {}",
                user.id
            )));
        }
        Ok((user, channel.clone()))
    }

    fn channel_messages(&self, channel_id: ChannelId) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|message| message.channel_id == channel_id)
            .cloned()
            .collect()
    }

    fn mark_read(&mut self, user_id: UserId, channel_id: ChannelId) {
        let latest = self
            .messages
            .iter()
            .filter(|message| message.channel_id == channel_id)
            .map(|message| message.id)
            .max();
        if let Some(latest) = latest {
            self.read_marks.insert((user_id, channel_id), latest);
        }
    }

    fn has_live_session(&self, channel_id: ChannelId) -> bool {
        self.live_sessions
            .values()
            .any(|binding| binding.channel_id == channel_id)
    }

    fn append_message(
        &mut self,
        channel: &Channel,
        sender: User,
        body: &str,
    ) -> (Message, Vec<MessageHandler>) {
        let message = Message {
            id: self.next_message_id,
            channel_id: channel.id,
            sender: Some(sender.clone()),
            body: body.to_owned(),
            created_at: Utc::now(),
        };
        self.next_message_id += 1;
        self.messages.push(message.clone());
        self.read_marks.insert((sender.id, channel.id), message.id);

        if let Some(current) = self.current_user.as_ref().map(|user| user.id) {
            if self.has_live_session(channel.id) {
                self.mark_read(current, channel.id);
            }
        }

        let handlers = self
            .live_sessions
            .values()
            .filter(|binding| binding.channel_id == channel.id)
            .map(|binding| Arc::clone(&binding.handler))
            .collect();

        (message, handlers)
    }
}

fn deliver(message: &Message, handlers: Vec<MessageHandler>) {
    for handler in handlers {
        handler(message.clone());
    }
}

#[async_trait]
impl ChatBackend for InMemoryBackend {
    async fn start_session(&self, identity: &Identity) -> BackendResult<()> {
        self.begin(Operation::StartSession).await?;

        let user = {
            let mut state = self.shared.lock()?;
            let user = state
                .users
                .iter()
                .find(|user| user.name == identity.username)
                .cloned()
                .ok_or(BackendError::Unauthorized)?;
            state.current_user = Some(user.clone());
            user
        };

        self.emit(SessionEvent::CurrentUserChanged(Some(user)));
        self.emit(SessionEvent::CurrentUserOnline);
        Ok(())
    }

    async fn end_session(&self) -> BackendResult<()> {
        self.begin(Operation::EndSession).await?;

        let previous = {
            let mut state = self.shared.lock()?;
            state.live_sessions.clear();
            state.current_user.take()
        };

        if previous.is_some() {
            self.emit(SessionEvent::CurrentUserOffline);
            self.emit(SessionEvent::CurrentUserChanged(None));
        }
        Ok(())
    }

    async fn get_users(&self) -> BackendResult<PageBox<User>> {
        self.begin(Operation::GetUsers).await?;

        let state = self.shared.lock()?;
        state.require_user()?;
        Ok(first_page(
            Arc::clone(&self.shared),
            state.users.clone(),
            state.page_size,
        ))
    }

    async fn get_channels(&self, filter: ChannelFilter) -> BackendResult<PageBox<Channel>> {
        self.begin(Operation::GetChannels).await?;

        let state = self.shared.lock()?;
        let user = state.require_user()?;
        let channels = state
            .channels
            .iter()
            .filter(|channel| channel.has_member(user.id) == filter.joined)
            .cloned()
            .collect();
        Ok(first_page(
            Arc::clone(&self.shared),
            channels,
            state.page_size,
        ))
    }

    async fn get_messages(&self, channel: &Channel) -> BackendResult<PageBox<Message>> {
        self.begin(Operation::GetMessages).await?;

        let state = self.shared.lock()?;
        state.joined_channel(channel.id)?;
        Ok(first_page(
            Arc::clone(&self.shared),
            state.channel_messages(channel.id),
            state.page_size,
        ))
    }

    async fn get_unread_messages_count(&self, channel: &Channel) -> BackendResult<u64> {
        self.begin(Operation::GetUnreadCount).await?;

        let state = self.shared.lock()?;
        let (user, channel) = state.joined_channel(channel.id)?;
        let read_up_to = state
            .read_marks
            .get(&(user.id, channel.id))
            .copied()
            .unwrap_or(0);
        let unread = state
            .messages
            .iter()
            .filter(|message| message.channel_id == channel.id && message.id > read_up_to)
            .filter(|message| message.sender.as_ref().map(|sender| sender.id) != Some(user.id))
            .count();

        Ok(unread as u64)
    }

    async fn send_keystrokes(&self, channel: &Channel, keys: &str) -> BackendResult<()> {
        self.begin(Operation::SendKeystrokes).await?;

        let mut state = self.shared.lock()?;
        state.joined_channel(channel.id)?;
        state.keystrokes.push((channel.id, keys.to_owned()));
        Ok(())
    }

    async fn send_message(&self, channel: &Channel, body: &str) -> BackendResult<Message> {
        self.begin(Operation::SendMessage).await?;

        if body.trim().is_empty() {
            return Err(BackendError::rejected("message body is empty"));
        }

        let (message, handlers) = {
            let mut state = self.shared.lock()?;
            let (user, channel) = state.joined_channel(channel.id)?;
            state.append_message(&channel, user, body)
        };

        deliver(&message, handlers);
        Ok(message)
    }

    fn start_chat_session(
        &self,
        channel: &Channel,
        on_received_message: MessageHandler,
    ) -> BackendResult<LiveSession> {
        let mut state = self.shared.lock()?;
        state.take_fault(Operation::StartChatSession)?;
        let (user, channel) = state.joined_channel(channel.id)?;

        let id = state.next_session_id;
        state.next_session_id += 1;
        state.live_sessions.insert(
            id,
            LiveBinding {
                channel_id: channel.id,
                handler: on_received_message,
            },
        );
        state.mark_read(user.id, channel.id);

        let shared = Arc::clone(&self.shared);
        Ok(LiveSession::new(id, channel, move || {
            if let Ok(mut state) = shared.state.lock() {
                state.live_sessions.remove(&id);
            }
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

struct MemoryPage<T> {
    shared: Arc<Shared>,
    all: Arc<Vec<T>>,
    start: usize,
    end: usize,
    page_size: usize,
}

fn first_page<T>(shared: Arc<Shared>, items: Vec<T>, page_size: usize) -> PageBox<T>
where
    T: Clone + Send + Sync + 'static,
{
    Box::new(MemoryPage::slice(shared, Arc::new(items), 0, page_size))
}

impl<T> MemoryPage<T> {
    fn slice(shared: Arc<Shared>, all: Arc<Vec<T>>, start: usize, page_size: usize) -> Self {
        let end = (start + page_size).min(all.len());
        Self {
            shared,
            all,
            start,
            end,
            page_size,
        }
    }
}

#[async_trait]
impl<T> RemotePage<T> for MemoryPage<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn items(&self) -> &[T] {
        &self.all[self.start..self.end]
    }

    fn has_next_page(&self) -> bool {
        self.end < self.all.len()
    }

    async fn next_page(&self) -> BackendResult<PageBox<T>> {
        self.shared.begin(Operation::NextPage).await?;

        if !self.has_next_page() {
            return Err(BackendError::rejected("no further page"));
        }

        Ok(Box::new(MemoryPage::slice(
            Arc::clone(&self.shared),
            Arc::clone(&self.all),
            self.end,
            self.page_size,
        )))
    }
}
