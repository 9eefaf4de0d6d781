//! Data structures for delivery channel configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::HttpRetryConfig;

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// Configuration for a Telegram bot.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TelegramConfig {
    /// The Telegram bot token.
    pub token: String,
    /// Base URL of the Bot API. Overridden in tests.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Whether to disable web page preview for the message.
    #[serde(default)]
    pub disable_web_preview: Option<bool>,
    /// The retry policy configuration for HTTP requests.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for a Twilio account, shared by SMS and WhatsApp.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TwilioConfig {
    /// Account SID, also the basic-auth user.
    pub account_sid: String,
    /// Auth token, the basic-auth password.
    pub auth_token: String,
    /// Sender number in E.164 form.
    pub from_number: String,
    /// Base URL of the REST API. Overridden in tests.
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
    /// The retry policy configuration for HTTP requests.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// Configuration for a generic webhook.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WebhookConfig {
    /// The URL of the webhook endpoint.
    pub url: Url,
    /// An optional secret for signing webhook requests.
    #[serde(default)]
    pub secret: Option<String>,
    /// Optional custom headers to include in the webhook request.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// The retry policy configuration for HTTP requests.
    #[serde(default)]
    pub retry_policy: HttpRetryConfig,
}

/// The kind-specific part of a channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelTypeConfig {
    /// Telegram Bot API.
    Telegram(TelegramConfig),
    /// Twilio SMS.
    Sms(TwilioConfig),
    /// Twilio WhatsApp.
    Whatsapp(TwilioConfig),
    /// A generic JSON webhook.
    Webhook(WebhookConfig),
}

impl ChannelTypeConfig {
    /// Short kind label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelTypeConfig::Telegram(_) => "telegram",
            ChannelTypeConfig::Sms(_) => "sms",
            ChannelTypeConfig::Whatsapp(_) => "whatsapp",
            ChannelTypeConfig::Webhook(_) => "webhook",
        }
    }
}

/// Whether a destination is a person or a broadcast target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    /// A direct recipient.
    Direct,
    /// A shared broadcast destination, e.g. a Telegram channel.
    Broadcast,
}

/// A single address a channel delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    /// Provider-specific address (chat id, phone number, ...).
    pub address: String,
    /// Direct or broadcast.
    pub kind: DestinationKind,
}

/// Errors raised when validating a channel configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelConfigError {
    /// The channel has no name.
    #[error("Channel name cannot be empty.")]
    EmptyName,

    /// Error for empty Telegram token.
    #[error("Telegram token cannot be empty.")]
    EmptyTelegramToken,

    /// Account SID, auth token or sender is missing.
    #[error("Twilio credentials are incomplete.")]
    IncompleteTwilioCredentials,

    /// A phone number holds something other than digits and a leading `+`.
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    /// Neither recipients nor a broadcast destination are configured.
    #[error("Channel has no destination.")]
    NoDestination,
}

/// Represents a single channel configuration from the YAML file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChannelConfig {
    /// The unique name of the channel.
    pub name: String,

    /// The specific configuration for the channel kind.
    #[serde(flatten)]
    pub config: ChannelTypeConfig,

    /// Direct recipients.
    #[serde(default)]
    pub recipients: Vec<String>,

    /// Optional broadcast destination.
    #[serde(default)]
    pub broadcast: Option<String>,
}

impl ChannelConfig {
    /// Validates the channel configuration.
    pub fn validate(&self) -> Result<(), ChannelConfigError> {
        if self.name.trim().is_empty() {
            return Err(ChannelConfigError::EmptyName);
        }
        match &self.config {
            ChannelTypeConfig::Telegram(config) => {
                if config.token.trim().is_empty() {
                    return Err(ChannelConfigError::EmptyTelegramToken);
                }
            }
            ChannelTypeConfig::Sms(config) | ChannelTypeConfig::Whatsapp(config) => {
                if config.account_sid.is_empty()
                    || config.auth_token.is_empty()
                    || config.from_number.is_empty()
                {
                    return Err(ChannelConfigError::IncompleteTwilioCredentials);
                }
                let numbers = std::iter::once(&config.from_number)
                    .chain(self.recipients.iter().filter(|n| !n.trim().is_empty()))
                    .chain(self.broadcast.iter());
                for number in numbers {
                    if normalize_phone_number(number).is_none() {
                        return Err(ChannelConfigError::InvalidPhoneNumber(number.clone()));
                    }
                }
            }
            // The endpoint itself is the destination.
            ChannelTypeConfig::Webhook(_) => return Ok(()),
        }
        if self.destinations().is_empty() {
            return Err(ChannelConfigError::NoDestination);
        }
        Ok(())
    }

    /// Every destination of this channel, direct recipients first.
    ///
    /// A webhook without explicit destinations delivers once, to its
    /// endpoint.
    pub fn destinations(&self) -> Vec<Destination> {
        let mut destinations: Vec<Destination> = self
            .recipients
            .iter()
            .filter(|address| !address.trim().is_empty())
            .map(|address| Destination {
                address: address.trim().to_string(),
                kind: DestinationKind::Direct,
            })
            .collect();
        if let Some(address) = self.broadcast.as_deref().map(str::trim)
            && !address.is_empty()
        {
            destinations
                .push(Destination { address: address.to_string(), kind: DestinationKind::Broadcast });
        }
        if destinations.is_empty()
            && let ChannelTypeConfig::Webhook(config) = &self.config
        {
            destinations
                .push(Destination { address: config.url.to_string(), kind: DestinationKind::Direct });
        }
        destinations
    }
}

/// Normalizes a phone number to `+<digits>`, accepting a missing `+` and a
/// `whatsapp:` prefix. Returns `None` when anything else is present.
pub fn normalize_phone_number(number: &str) -> Option<String> {
    let number = number.trim();
    let number = number.strip_prefix("whatsapp:").unwrap_or(number);
    let digits = number.strip_prefix('+').unwrap_or(number);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("+{digits}"))
}
