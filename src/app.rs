use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};

use crate::{
    backend,
    cli::{Cli, Command},
    domain::{
        self,
        channel::{Channel, ChannelId, ChannelSummary},
        draft::MessageDraft,
        message::Message,
        user::Identity,
    },
    infra::{self, error::AppError},
    usecases::{
        self,
        bootstrap::{self, Bootstrapped},
        context::ChatApp,
        drafts::SendOutcome,
    },
};

const CLI_CHANNELS_INCOMPLETE: &str = "CLI_CHANNELS_INCOMPLETE";

pub fn run(cli: Cli) -> Result<()> {
    let Bootstrapped { config, backend } = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    let lines = runtime.block_on(async {
        let app = ChatApp::init(backend, &config)?;
        let wait = config.backend.request_timeout();
        let result = execute(&app, &cli.command, wait).await;
        app.shutdown().await;
        result
    })?;

    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// Signs in as the command's user and runs it, returning the lines to print.
async fn execute(app: &ChatApp, command: &Command, wait: Duration) -> Result<Vec<String>> {
    let username = command.user();
    app.login(Identity::new(username)).await;
    if let Some(error) = app.snapshot().last_error {
        bail!("could not sign in as {username} ({})", error.code);
    }
    if app.wait_for_user(wait).await.is_none() {
        bail!("no current user reported for {username}");
    }

    match command {
        Command::Channels { .. } => list_channels(app).await,
        Command::History { channel, .. } => {
            let channel = find_joined_channel(app, *channel).await?;
            let history = app.channel_messages(&channel);
            history.fetch_all().await;
            if let Some(error) = history.failure() {
                return Err(anyhow!(error)).context("message history is incomplete");
            }
            Ok(history.items().iter().map(format_message_line).collect())
        }
        Command::Send { channel, text, .. } => {
            let channel = find_joined_channel(app, *channel).await?;
            send_text(app, &channel, text).await
        }
    }
}

async fn list_channels(app: &ChatApp) -> Result<Vec<String>> {
    let channels = app.joined_channels();
    channels.fetch_all().await;
    if let Some(error) = channels.failure() {
        tracing::warn!(
            code = CLI_CHANNELS_INCOMPLETE,
            error_code = error.code(),
            listed = channels.len(),
            "channel list is incomplete"
        );
    }

    let mut lines = Vec::with_capacity(channels.len());
    for channel in channels.items() {
        lines.push(format_channel_line(&app.channel_summary(&channel).await));
    }
    Ok(lines)
}

async fn send_text(app: &ChatApp, channel: &Channel, text: &str) -> Result<Vec<String>> {
    app.show_channel(channel);
    let session = app.start_chat_session(channel, |message| {
        tracing::debug!(message_id = message.id, channel_id = message.channel_id, "message delivered");
    });
    if session.is_none() {
        tracing::warn!(channel_id = channel.id, "sending without a live session");
    }

    app.update_message_draft(MessageDraft::text(text)).await;
    match app.send_message_draft(MessageDraft::text(text)).await {
        SendOutcome::Sent(message) => Ok(vec![format_message_line(&message)]),
        SendOutcome::Failed(error) => Err(anyhow!(error)).context("message was not sent"),
        SendOutcome::NoActiveChannel => bail!("no active channel to send to"),
    }
}

async fn find_joined_channel(app: &ChatApp, channel_id: ChannelId) -> Result<Channel> {
    let channels = app.joined_channels();
    channels.fetch_all().await;
    channels
        .items()
        .into_iter()
        .find(|channel| channel.id == channel_id)
        .ok_or_else(|| anyhow!("channel {channel_id} is not joined by the current user"))
}

fn format_channel_line(summary: &ChannelSummary) -> String {
    let marker = if summary.is_selected { "*" } else { " " };
    let picture = summary.display_picture.as_deref().unwrap_or("-");
    format!(
        "{marker}[{}] {} unread={} picture={picture}",
        summary.channel_id, summary.display_name, summary.unread_count
    )
}

fn format_message_line(message: &Message) -> String {
    format!(
        "{} {}: {}",
        message.created_at.format("%Y-%m-%d %H:%M:%S"),
        message.sender_display_name(),
        message.body
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        backend::memory::{InMemoryBackend, Operation},
        infra::config::AppConfig,
        test_support::{bob, seeded_backend, DIRECT_ALICE_BOB, GENERAL, OPS},
    };

    const WAIT: Duration = Duration::from_secs(1);

    fn app_over(backend: &Arc<InMemoryBackend>) -> ChatApp {
        ChatApp::init(backend.clone(), &AppConfig::default()).expect("runtime is running")
    }

    #[test]
    fn formats_channel_line() {
        let summary = ChannelSummary {
            channel_id: 100,
            display_name: "Bob".to_owned(),
            display_picture: None,
            unread_count: 3,
            is_selected: true,
        };

        assert_eq!(format_channel_line(&summary), "*[100] Bob unread=3 picture=-");
    }

    #[test]
    fn formats_message_line_with_system_sender() {
        let message = Message {
            id: 1,
            channel_id: 100,
            sender: None,
            body: "channel created".to_owned(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).single().expect("valid time"),
        };

        assert_eq!(
            format_message_line(&message),
            "2024-05-01 09:30:00 system: channel created"
        );
    }

    #[tokio::test]
    async fn channels_lists_joined_channels_as_seen_by_user() {
        let backend = Arc::new(seeded_backend());
        backend.post_as(2, DIRECT_ALICE_BOB, "hi").expect("post");
        let app = app_over(&backend);

        let lines = execute(&app, &Command::Channels { user: "alice".to_owned() }, WAIT)
            .await
            .expect("channels should list");

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            format!(" [{DIRECT_ALICE_BOB}] Bob unread=1 picture={}", bob().display_picture)
        );
        assert!(lines[1].contains("general"));
        assert!(lines[2].contains("Bob, Carol"));
    }

    #[tokio::test]
    async fn send_posts_message_and_reports_it() {
        let backend = Arc::new(seeded_backend());
        let app = app_over(&backend);
        let command = Command::Send {
            user: "alice".to_owned(),
            channel: GENERAL,
            text: "shipping now".to_owned(),
        };

        let lines = execute(&app, &command, WAIT).await.expect("send should succeed");

        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("Alice: shipping now"));
        assert_eq!(backend.keystrokes(), vec![(GENERAL, "shipping now".to_owned())]);
        assert_eq!(backend.messages_in(GENERAL).len(), 1);
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let backend = Arc::new(seeded_backend());
        backend.fail_next(Operation::SendMessage);
        let app = app_over(&backend);
        let command = Command::Send {
            user: "alice".to_owned(),
            channel: GENERAL,
            text: "lost".to_owned(),
        };

        let error = execute(&app, &command, WAIT).await.expect_err("send should fail");

        assert!(error.to_string().contains("not sent"));
        assert!(backend.messages_in(GENERAL).is_empty());
    }

    #[tokio::test]
    async fn history_prints_messages_in_order() {
        let backend = Arc::new(seeded_backend());
        for body in ["first", "second", "third"] {
            backend.post_as(3, GENERAL, body).expect("post");
        }
        let app = app_over(&backend);
        let command = Command::History {
            user: "alice".to_owned(),
            channel: GENERAL,
        };

        let lines = execute(&app, &command, WAIT).await.expect("history should print");

        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Carol: first"));
        assert!(lines[2].ends_with("Carol: third"));
    }

    #[tokio::test]
    async fn history_of_unjoined_channel_fails() {
        let backend = Arc::new(seeded_backend());
        let app = app_over(&backend);
        let command = Command::History {
            user: "alice".to_owned(),
            channel: OPS,
        };

        assert!(execute(&app, &command, WAIT).await.is_err());
    }

    #[tokio::test]
    async fn unknown_user_cannot_sign_in() {
        let backend = Arc::new(seeded_backend());
        let app = app_over(&backend);

        let error = execute(&app, &Command::Channels { user: "mallory".to_owned() }, WAIT)
            .await
            .expect_err("sign in should fail");

        assert!(error.to_string().contains("BACKEND_UNAUTHORIZED"));
    }
}
