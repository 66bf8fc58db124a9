use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::channel::ChannelId;

#[derive(Debug, Parser)]
#[command(name = "palaver", about = "Chat session orchestration over an in-memory backend")]
pub struct Cli {
    /// Path to config file (default: ./palaver.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List joined channels with display name, picture and unread count
    Channels {
        /// Username to sign in as
        #[arg(short, long)]
        user: String,
    },
    /// Print a channel's message history
    History {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        channel: ChannelId,
    },
    /// Type and send a message to a channel
    Send {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        channel: ChannelId,
        text: String,
    },
}

impl Command {
    pub fn user(&self) -> &str {
        match self {
            Self::Channels { user } | Self::History { user, .. } | Self::Send { user, .. } => user,
        }
    }
}
