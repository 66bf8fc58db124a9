//! Fixtures shared by the unit tests.

use crate::{
    backend::memory::InMemoryBackend,
    domain::{
        channel::{Channel, ChannelId},
        user::User,
    },
};

pub const DIRECT_ALICE_BOB: ChannelId = 100;
pub const GENERAL: ChannelId = 101;
pub const DIRECT_TRIO: ChannelId = 102;
pub const OPS: ChannelId = 103;

pub fn alice() -> User {
    User::new(1, "alice", "Alice", "https://pics.example/alice.png")
}

pub fn bob() -> User {
    User::new(2, "bob", "Bob", "https://pics.example/bob.png")
}

pub fn carol() -> User {
    User::new(3, "carol", "Carol", "https://pics.example/carol.png")
}

pub fn direct_alice_bob() -> Channel {
    Channel::direct(DIRECT_ALICE_BOB, [alice(), bob()])
}

pub fn general() -> Channel {
    Channel::group(GENERAL, "general", [alice(), bob(), carol()])
}

pub fn direct_trio() -> Channel {
    Channel::direct(DIRECT_TRIO, [alice(), bob(), carol()])
}

pub fn ops() -> Channel {
    Channel::group(OPS, "ops", [bob(), carol()])
}

/// Three users; alice belongs to every channel except `ops`. Pages hold two items.
pub fn seeded_backend() -> InMemoryBackend {
    let backend = InMemoryBackend::new(2);
    for user in [alice(), bob(), carol()] {
        backend.add_user(user);
    }
    for channel in [direct_alice_bob(), general(), direct_trio(), ops()] {
        backend.add_channel(channel);
    }
    backend
}

/// Lets spawned tasks (the session events monitor) catch up.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
