//! Generic JSON webhook channel.
//!
//! Posts every message as a small JSON document. When a secret is
//! configured the body is signed with HMAC-SHA256 and the signature and
//! timestamp travel in the `X-Signature` and `X-Timestamp` headers.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::json;
use sha2::Sha256;
use url::Url;

use super::{error::NotificationError, traits::ChannelProvider};
use crate::models::{MessageFormat, channel::WebhookConfig};

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Delivers messages to an HTTP endpoint.
#[derive(Debug)]
pub struct WebhookProvider {
    url: Url,
    client: Arc<ClientWithMiddleware>,
    secret: Option<String>,
    headers: HashMap<String, String>,
}

impl WebhookProvider {
    /// Creates a provider from its configuration and a pooled client.
    pub fn new(config: &WebhookConfig, client: Arc<ClientWithMiddleware>) -> Self {
        Self {
            url: config.url.clone(),
            client,
            secret: config.secret.clone(),
            headers: config.headers.clone().unwrap_or_default(),
        }
    }

    /// Signs `payload` with `secret`, returning the hex signature and the
    /// millisecond timestamp that was mixed in.
    pub fn sign_payload(
        &self,
        secret: &str,
        payload: &serde_json::Value,
    ) -> Result<(String, String), NotificationError> {
        // `new_from_slice` accepts empty keys.
        if secret.is_empty() {
            return Err(NotificationError::NotifyFailed(
                "Invalid secret: cannot be empty.".to_string(),
            ));
        }

        let timestamp = Utc::now().timestamp_millis();
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotificationError::InternalError(format!("Invalid secret: {e}")))?;

        let serialized_payload = serde_json::to_string(payload).map_err(|e| {
            NotificationError::InternalError(format!("Failed to serialize payload: {e}"))
        })?;
        mac.update(format!("{serialized_payload}{timestamp}").as_bytes());

        let signature = hex::encode(mac.finalize().into_bytes());
        Ok((signature, timestamp.to_string()))
    }

    fn build_headers(&self, payload: &serde_json::Value) -> Result<HeaderMap, NotificationError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("application/json"),
        );

        if let Some(secret) = &self.secret {
            let (signature, timestamp) = self.sign_payload(secret, payload)?;
            headers.insert(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_str(&signature).map_err(|e| {
                    NotificationError::NotifyFailed(format!("Invalid signature value: {e}"))
                })?,
            );
            headers.insert(
                HeaderName::from_static("x-timestamp"),
                HeaderValue::from_str(&timestamp).map_err(|e| {
                    NotificationError::NotifyFailed(format!("Invalid timestamp value: {e}"))
                })?,
            );
        }

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                NotificationError::NotifyFailed(format!("Invalid header name: {key}: {e}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                NotificationError::NotifyFailed(format!(
                    "Invalid header value for {key}: {value}: {e}"
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl ChannelProvider for WebhookProvider {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotificationError> {
        let payload = json!({
            "destination": destination,
            "format": format,
            "text": text,
        });
        let headers = self.build_headers(&payload)?;

        let response =
            self.client.post(self.url.clone()).headers(headers).json(&payload).send().await?;
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

    fn create_test_provider(
        url: &str,
        secret: Option<&str>,
        headers: Option<HashMap<String, String>>,
    ) -> WebhookProvider {
        let config = WebhookConfig {
            url: Url::parse(url).unwrap(),
            secret: secret.map(str::to_string),
            headers,
            retry_policy: HttpRetryConfig::no_retries(),
        };
        let client =
            Arc::new(reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build());
        WebhookProvider::new(&config, client)
    }

    #[test]
    fn test_sign_payload() {
        let provider = create_test_provider("https://webhook.example.com", None, None);
        let (signature, timestamp) =
            provider.sign_payload("test-secret", &json!({"text": "hi"})).unwrap();

        assert_eq!(signature.len(), 64);
        assert!(hex::decode(&signature).is_ok());
        assert!(timestamp.parse::<i64>().is_ok());
    }

    #[test]
    fn test_sign_payload_fails_empty_secret() {
        let provider = create_test_provider("https://webhook.example.com", None, None);
        let result = provider.sign_payload("", &json!({}));
        assert!(matches!(result, Err(NotificationError::NotifyFailed(_))));
    }

    #[tokio::test]
    async fn test_send_posts_json_with_signature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("X-Signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
            .match_header("X-Timestamp", Matcher::Regex("^[0-9]+$".to_string()))
            .match_header("Content-Type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "destination": "ops",
                "format": "plain",
                "text": "#1"
            })))
            .with_status(200)
            .create_async()
            .await;

        let provider =
            create_test_provider(&format!("{}/hook", server.url()), Some("top-secret"), None);
        let result = provider.send("ops", "#1", MessageFormat::Plain).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_with_custom_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("X-Custom-Header", "valid-value")
            .with_status(200)
            .create_async()
            .await;

        let headers = HashMap::from([("X-Custom-Header".to_string(), "valid-value".to_string())]);
        let provider = create_test_provider(&server.url(), None, Some(headers));
        let result = provider.send("ops", "#1", MessageFormat::Rich).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_with_invalid_header_name() {
        let server = mockito::Server::new_async().await;
        let headers = HashMap::from([("Invalid Header!@#".to_string(), "value".to_string())]);
        let provider = create_test_provider(&server.url(), None, Some(headers));

        let err = provider.send("ops", "#1", MessageFormat::Rich).await.unwrap_err();
        assert!(err.to_string().contains("Invalid header name"));
    }

    #[tokio::test]
    async fn test_send_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/").with_status(500).create_async().await;

        let provider = create_test_provider(&server.url(), None, None);
        let err = provider.send("ops", "#1", MessageFormat::Rich).await.unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { status: 500, .. }));
    }
}
