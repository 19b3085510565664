//! Long-poll loop for inbound messages

use crate::commands;
use crate::handlers::handle;
use async_trait::async_trait;
use radar_common::messaging::telegram::Update;
use radar_common::messaging::{TelegramBot, TransportError};
use radar_common::RadarContext;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Pause after a failed poll before trying again
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Source of inbound updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TransportError>;
}

#[async_trait]
impl UpdateSource for TelegramBot {
    async fn updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TransportError> {
        self.get_updates(offset, timeout_secs).await
    }
}

/// Fetch one batch of updates and handle each, in order
///
/// Returns the offset for the next poll. Handler failures are logged per
/// message and never stop the batch.
pub async fn poll_once(
    ctx: &RadarContext,
    source: &dyn UpdateSource,
    offset: i64,
    timeout_secs: u64,
) -> Result<i64, TransportError> {
    let updates = source.updates(offset, timeout_secs).await?;
    let mut next = offset;

    for update in updates {
        next = next.max(update.update_id + 1);

        let Some(message) = update.message else {
            continue;
        };
        let Some(command) = message.text.as_deref().and_then(commands::parse) else {
            continue;
        };

        let chat = message.chat.id;
        debug!(chat, chat_name = %message.chat.display_name(), ?command, "Handling command");
        if let Err(e) = handle(ctx, chat, command).await {
            error!(chat, chat_name = %message.chat.display_name(), "Command failed: {}", e);
        }
    }

    Ok(next)
}

/// Poll forever
pub async fn run(ctx: &RadarContext, source: &dyn UpdateSource, timeout_secs: u64) {
    let mut offset = 0;
    loop {
        match poll_once(ctx, source, offset, timeout_secs).await {
            Ok(next) => offset = next,
            Err(TransportError::RetryAfter(wait)) => {
                warn!("Polling rate limited, waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                warn!("Polling failed: {}, retrying in {:?}", e, POLL_ERROR_BACKOFF);
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
            }
        }
    }
}
