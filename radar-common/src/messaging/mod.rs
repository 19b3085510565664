//! Messaging transport
//!
//! [`Messenger`] is the outbound side of the chat platform. Sends are single
//! attempts; a throttled send reports [`TransportError::RetryAfter`] and
//! [`retry_rate_limited`] waits it out.

pub mod telegram;

pub use telegram::TelegramBot;

use crate::db::RecipientId;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Messaging transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Platform throttled the bot; retry the same send after the wait
    #[error("Rate limited, retry after {0:?}")]
    RetryAfter(Duration),

    /// Permanent failure for this send, e.g. the recipient blocked the bot
    #[error("Send rejected ({code}): {description}")]
    Rejected { code: i64, description: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Photo to attach to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    /// Fresh upload from a URL
    Url(String),
    /// Handle returned by an earlier successful send
    Handle(String),
}

impl Media {
    pub fn as_str(&self) -> &str {
        match self {
            Media::Url(url) => url,
            Media::Handle(handle) => handle,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Media::Url(_))
    }
}

/// Inline URL button shown under a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub text: String,
    pub url: String,
}

/// Text formatting of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Telegram MarkdownV2; text must already be escaped
    MarkdownV2,
}

/// Outbound chat messaging
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        recipient: RecipientId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError>;

    /// Send a photo with a MarkdownV2 caption and an optional link button
    ///
    /// Returns the platform's reusable handle for the delivered photo.
    async fn send_photo(
        &self,
        recipient: RecipientId,
        media: &Media,
        caption: &str,
        link: Option<&LinkButton>,
    ) -> Result<String, TransportError>;
}

/// Repeat a send for as long as the platform asks us to wait
///
/// Every error other than [`TransportError::RetryAfter`] is returned as is.
pub async fn retry_rate_limited<T, F, Fut>(mut send: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    loop {
        match send().await {
            Err(TransportError::RetryAfter(wait)) => {
                warn!("Rate limited, retrying in {:?}", wait);
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}
