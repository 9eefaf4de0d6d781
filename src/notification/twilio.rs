//! Twilio SMS and WhatsApp channels.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest_middleware::ClientWithMiddleware;

use super::{error::NotificationError, traits::ChannelProvider};
use crate::models::{
    MessageFormat,
    channel::{ChannelConfigError, TwilioConfig, normalize_phone_number},
    message::strip_markup,
};

static BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<b>(.*?)</b>").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

static ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<i>(.*?)</i>").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

/// Which Twilio messaging product to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwilioChannel {
    /// Plain SMS. Rich text is flattened to plain text.
    Sms,
    /// WhatsApp. Bold and italic markup become `*` and `_`.
    WhatsApp,
}

impl TwilioChannel {
    fn address(&self, number: &str) -> String {
        match self {
            TwilioChannel::Sms => number.to_string(),
            TwilioChannel::WhatsApp => format!("whatsapp:{number}"),
        }
    }

    fn render(&self, text: &str, format: MessageFormat) -> String {
        match (self, format) {
            (_, MessageFormat::Plain) => text.to_string(),
            (TwilioChannel::Sms, MessageFormat::Rich) => strip_markup(text),
            (TwilioChannel::WhatsApp, MessageFormat::Rich) => {
                let text = BOLD.replace_all(text, "*$1*");
                let text = ITALIC.replace_all(&text, "_${1}_");
                strip_markup(&text)
            }
        }
    }
}

/// Sends messages through the Twilio Messages API.
pub struct TwilioProvider {
    client: Arc<ClientWithMiddleware>,
    channel: TwilioChannel,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

impl TwilioProvider {
    /// Creates a provider from its configuration and a pooled client.
    pub fn new(
        config: &TwilioConfig,
        channel: TwilioChannel,
        client: Arc<ClientWithMiddleware>,
    ) -> Result<Self, NotificationError> {
        let from = normalize_phone_number(&config.from_number)
            .ok_or_else(|| ChannelConfigError::InvalidPhoneNumber(config.from_number.clone()))?;
        let endpoint = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base.trim_end_matches('/'),
            config.account_sid
        );
        Ok(Self {
            client,
            channel,
            endpoint,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from,
        })
    }
}

#[async_trait]
impl ChannelProvider for TwilioProvider {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotificationError> {
        let to = normalize_phone_number(destination)
            .ok_or_else(|| ChannelConfigError::InvalidPhoneNumber(destination.to_string()))?;
        let body = self.channel.render(text, format);
        let form = [
            ("To", self.channel.address(&to)),
            ("From", self.channel.address(&self.from)),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotificationError::rejected(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::config::HttpRetryConfig;

    fn provider(server: &mockito::ServerGuard, channel: TwilioChannel) -> TwilioProvider {
        let config = TwilioConfig {
            account_sid: "AC1".to_string(),
            auth_token: "token".to_string(),
            from_number: "15550001".to_string(),
            api_base: server.url(),
            retry_policy: HttpRetryConfig::no_retries(),
        };
        let client =
            Arc::new(reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build());
        TwilioProvider::new(&config, channel, client).unwrap()
    }

    #[test]
    fn test_whatsapp_renders_markdown() {
        let rendered = TwilioChannel::WhatsApp
            .render("🚂 <b>#1</b> | <i>SUF</i> | A&amp;B", MessageFormat::Rich);
        assert_eq!(rendered, "🚂 *#1* | _SUF_ | A&B");
        assert_eq!(TwilioChannel::Sms.render("<b>#1</b>", MessageFormat::Rich), "#1");
    }

    #[tokio::test]
    async fn test_sms_send_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC1/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".into(), "+15550002".into()),
                Matcher::UrlEncoded("From".into(), "+15550001".into()),
                Matcher::UrlEncoded("Body".into(), "#1 delayed".into()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let result = provider(&server, TwilioChannel::Sms)
            .send("+15550002", "<b>#1</b> delayed", MessageFormat::Rich)
            .await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_whatsapp_send_prefixes_addresses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC1/Messages.json")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".into(), "whatsapp:+919876543210".into()),
                Matcher::UrlEncoded("From".into(), "whatsapp:+15550001".into()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let result = provider(&server, TwilioChannel::WhatsApp)
            .send("919876543210", "hello", MessageFormat::Plain)
            .await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2010-04-01/Accounts/AC1/Messages.json")
            .with_status(400)
            .with_body(r#"{"code":21211,"message":"Invalid 'To' Phone Number"}"#)
            .create_async()
            .await;

        let err = provider(&server, TwilioChannel::Sms)
            .send("+1", "hi", MessageFormat::Plain)
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { status: 400, .. }));
    }
}
