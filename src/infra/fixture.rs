//! Seed data for the in-memory backend.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::{
    backend::memory::InMemoryBackend,
    domain::{
        channel::{Channel, ChannelId, ChannelKind},
        user::{User, UserId},
    },
    infra::error::AppError,
};

const BUILTIN_FIXTURE: &str = r#"
[[users]]
id = 1
name = "alice"
display_name = "Alice"
display_picture = "https://pics.example/alice.png"

[[users]]
id = 2
name = "bob"
display_name = "Bob"
display_picture = "https://pics.example/bob.png"

[[users]]
id = 3
name = "carol"
display_name = "Carol"
display_picture = "https://pics.example/carol.png"

[[channels]]
id = 100
kind = "direct"
members = [1, 2]

[[channels]]
id = 101
kind = "group"
name = "general"
members = [1, 2, 3]

[[channels]]
id = 102
kind = "direct"
members = [1, 2, 3]

[[messages]]
channel = 100
sender = 2
body = "hey, are you around?"

[[messages]]
channel = 101
sender = 3
body = "standup in five"

[[messages]]
channel = 101
sender = 1
body = "on my way"
"#;

#[derive(Debug, Deserialize, Default)]
pub struct FixtureFile {
    #[serde(default)]
    pub users: Vec<FixtureUser>,
    #[serde(default)]
    pub channels: Vec<FixtureChannel>,
    #[serde(default)]
    pub messages: Vec<FixtureMessage>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureUser {
    pub id: UserId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub display_picture: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureChannelKind {
    Direct,
    Group,
}

#[derive(Debug, Deserialize)]
pub struct FixtureChannel {
    pub id: ChannelId,
    pub kind: FixtureChannelKind,
    #[serde(default)]
    pub name: String,
    pub members: Vec<UserId>,
}

/// Posted in file order, so later entries are newer.
#[derive(Debug, Deserialize)]
pub struct FixtureMessage {
    pub channel: ChannelId,
    pub sender: UserId,
    pub body: String,
}

pub fn load(path: &Path) -> Result<FixtureFile, AppError> {
    let raw = fs::read_to_string(path).map_err(|source| AppError::FixtureRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&raw, &path.display().to_string())
}

pub fn builtin() -> Result<FixtureFile, AppError> {
    parse(BUILTIN_FIXTURE, "builtin")
}

fn parse(raw: &str, origin: &str) -> Result<FixtureFile, AppError> {
    toml::from_str(raw).map_err(|source| AppError::FixtureParse {
        origin: origin.to_owned(),
        source,
    })
}

impl FixtureFile {
    pub fn seed(self, backend: &InMemoryBackend) -> Result<(), AppError> {
        let mut users = HashMap::new();
        for user in self.users {
            let user = User::new(user.id, user.name, user.display_name, user.display_picture);
            users.insert(user.id, user.clone());
            backend.add_user(user);
        }

        for channel in self.channels {
            let members = channel
                .members
                .iter()
                .map(|id| {
                    users.get(id).cloned().ok_or_else(|| AppError::FixtureInvalid {
                        reason: format!("channel {} lists unknown member {id}", channel.id),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let kind = match channel.kind {
                FixtureChannelKind::Direct => ChannelKind::Direct,
                FixtureChannelKind::Group => ChannelKind::Group,
            };
            backend.add_channel(Channel::new(channel.id, kind, channel.name, members));
        }

        for message in self.messages {
            backend
                .post_as(message.sender, message.channel, &message.body)
                .map_err(|error| AppError::FixtureInvalid {
                    reason: format!(
                        "message in channel {} from {}: {error}",
                        message.channel, message.sender
                    ),
                })?;
        }

        Ok(())
    }
}
