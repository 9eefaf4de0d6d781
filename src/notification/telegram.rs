//! Telegram Bot API channel.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;

use super::{error::NotificationError, traits::ChannelProvider};
use crate::models::{MessageFormat, channel::TelegramConfig};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

/// Sends messages through a Telegram bot.
///
/// Destinations are chat ids or `@channel` names. Rich text is sent with
/// the `HTML` parse mode, so a malformed tag makes Telegram reject the
/// message with 400 and the dispatcher falls back to plain text.
pub struct TelegramProvider {
    client: Arc<ClientWithMiddleware>,
    endpoint: String,
    disable_web_preview: bool,
}

impl TelegramProvider {
    /// Creates a provider from its configuration and a pooled client.
    pub fn new(config: &TelegramConfig, client: Arc<ClientWithMiddleware>) -> Self {
        let endpoint =
            format!("{}/bot{}/sendMessage", config.api_base.trim_end_matches('/'), config.token);
        Self {
            client,
            endpoint,
            disable_web_preview: config.disable_web_preview.unwrap_or(true),
        }
    }
}

#[async_trait]
impl ChannelProvider for TelegramProvider {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotificationError> {
        let body = SendMessageRequest {
            chat_id: destination,
            text,
            parse_mode: match format {
                MessageFormat::Rich => Some("HTML"),
                MessageFormat::Plain => None,
            },
            disable_web_page_preview: self.disable_web_preview,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::rejected(response).await);
        }
        Ok(())
    }
}
