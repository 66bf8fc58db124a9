use super::user::{User, UserId};

pub type ChannelId = i64;

const DIRECT_NAME_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Implicit conversation defined by its membership.
    Direct,
    /// Named conversation.
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub kind: ChannelKind,
    pub name: String,
    members: Vec<User>,
}

impl Channel {
    /// Builds a channel, keeping the first occurrence of every member id.
    pub fn new(
        id: ChannelId,
        kind: ChannelKind,
        name: impl Into<String>,
        members: impl IntoIterator<Item = User>,
    ) -> Self {
        let mut unique: Vec<User> = Vec::new();
        for member in members {
            if !unique.iter().any(|existing| existing.id == member.id) {
                unique.push(member);
            }
        }

        Self {
            id,
            kind,
            name: name.into(),
            members: unique,
        }
    }

    pub fn direct(id: ChannelId, members: impl IntoIterator<Item = User>) -> Self {
        Self::new(id, ChannelKind::Direct, String::new(), members)
    }

    pub fn group(
        id: ChannelId,
        name: impl Into<String>,
        members: impl IntoIterator<Item = User>,
    ) -> Self {
        Self::new(id, ChannelKind::Group, name, members)
    }

    pub fn is_direct(&self) -> bool {
        self.kind == ChannelKind::Direct
    }

    pub fn members(&self) -> &[User] {
        &self.members
    }

    pub fn has_member(&self, user_id: UserId) -> bool {
        self.members.iter().any(|member| member.id == user_id)
    }

    fn members_except(&self, current_user: Option<&User>) -> impl Iterator<Item = &User> {
        let excluded = current_user.map(|user| user.id);
        self.members
            .iter()
            .filter(move |member| Some(member.id) != excluded)
    }
}

/// Name a channel list shows for `channel` as seen by `current_user`.
///
/// Direct channels are named after the other members, in membership order.
pub fn display_name(channel: &Channel, current_user: Option<&User>) -> String {
    match channel.kind {
        ChannelKind::Direct => channel
            .members_except(current_user)
            .map(|member| member.display_name.as_str())
            .collect::<Vec<_>>()
            .join(DIRECT_NAME_SEPARATOR),
        ChannelKind::Group => channel.name.clone(),
    }
}

/// Picture for one-to-one direct channels: the other member's picture.
///
/// Anything else, including a direct channel whose membership does not
/// count exactly two users, has no derived picture.
pub fn display_picture(channel: &Channel, current_user: Option<&User>) -> Option<String> {
    if channel.kind != ChannelKind::Direct || channel.members.len() != 2 {
        return None;
    }

    channel
        .members_except(current_user)
        .next()
        .map(|member| member.display_picture.clone())
}

/// Everything a channel list row needs to render one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel_id: ChannelId,
    pub display_name: String,
    pub display_picture: Option<String>,
    pub unread_count: u64,
    /// Whether the live chat session is bound to this channel.
    pub is_selected: bool,
}
