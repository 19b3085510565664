//! Telegram Bot API transport

use super::{LinkButton, Media, Messenger, TextFormat, TransportError};
use crate::db::RecipientId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE_URL: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TransportError> {
        if let Some(wait) = self.parameters.as_ref().and_then(|p| p.retry_after) {
            return Err(TransportError::RetryAfter(Duration::from_secs(wait)));
        }
        if !self.ok {
            return Err(TransportError::Rejected {
                code: self.error_code.unwrap_or(0),
                description: self.description.unwrap_or_default(),
            });
        }
        self.result
            .ok_or_else(|| TransportError::Parse("response without result".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub first_name: Option<String>,
    pub title: Option<String>,
}

impl Chat {
    /// Display name: first name for private chats, title otherwise
    pub fn display_name(&self) -> &str {
        let name = if self.kind == "private" {
            self.first_name.as_deref()
        } else {
            self.title.as_deref()
        };
        name.unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

fn reply_markup(link: &LinkButton) -> Value {
    json!({ "inline_keyboard": [[{ "text": link.text, "url": link.url }]] })
}

/// Telegram Bot API client
pub struct TelegramBot {
    http_client: reqwest::Client,
    token: String,
}

impl TelegramBot {
    pub fn new(token: String) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self { http_client, token })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let url = format!("{}/bot{}/{}", API_BASE_URL, self.token, method);
        let mut request = self.http_client.post(&url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Error statuses (429, 403, ...) still carry the JSON envelope
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.without_url().to_string()))?;

        envelope.into_result()
    }

    /// Long-poll for inbound updates newer than `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TransportError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call(
            "getUpdates",
            &body,
            Some(Duration::from_secs(timeout_secs + REQUEST_TIMEOUT_SECS)),
        )
        .await
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send_text(
        &self,
        recipient: RecipientId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), TransportError> {
        let mut body = json!({
            "chat_id": recipient,
            "text": text,
            "disable_web_page_preview": true,
        });
        if format == TextFormat::MarkdownV2 {
            body["parse_mode"] = json!("MarkdownV2");
        }

        let _sent: Message = self.call("sendMessage", &body, None).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        recipient: RecipientId,
        media: &Media,
        caption: &str,
        link: Option<&LinkButton>,
    ) -> Result<String, TransportError> {
        let mut body = json!({
            "chat_id": recipient,
            "photo": media.as_str(),
            "caption": caption,
            "parse_mode": "MarkdownV2",
        });
        if let Some(link) = link {
            body["reply_markup"] = reply_markup(link);
        }

        let sent: Message = self.call("sendPhoto", &body, None).await?;
        largest_photo_handle(&sent)
    }
}

/// Handle of the largest size of a sent photo
fn largest_photo_handle(message: &Message) -> Result<String, TransportError> {
    message
        .photo
        .as_deref()
        .and_then(|sizes| sizes.iter().max_by_key(|size| size.width * size.height))
        .map(|size| size.file_id.clone())
        .ok_or_else(|| TransportError::Parse("sent message has no photo".to_string()))
}
