use std::{sync::Arc, time::Duration};

use crate::{backend::timeout::with_timeout, domain::channel::Channel, usecases::contracts::ChatBackend};

const UNREAD_COUNT_FAILED: &str = "UNREAD_COUNT_FAILED";

/// On-demand unread counts. A failed query reads as zero unread.
#[derive(Clone)]
pub struct UnreadCounter {
    backend: Arc<dyn ChatBackend>,
    timeout: Duration,
}

impl UnreadCounter {
    pub fn new(backend: Arc<dyn ChatBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn count(&self, channel: &Channel) -> u64 {
        match with_timeout(self.timeout, self.backend.get_unread_messages_count(channel)).await {
            Ok(count) => count,
            Err(error) => {
                tracing::debug!(
                    code = UNREAD_COUNT_FAILED,
                    channel_id = channel.id,
                    error_code = error.code(),
                    "unread count unavailable; reporting zero"
                );
                0
            }
        }
    }
}
