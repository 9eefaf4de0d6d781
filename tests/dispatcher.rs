//! Integration tests for the channel dispatcher

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockito::Matcher;
use railwatch::{
    config::{BaseHttpClientConfig, HttpRetryConfig},
    http_client::HttpClientPool,
    models::{
        ChannelConfig, ChannelTypeConfig, Destination, DestinationKind, MessageFormat,
        RenderedMessage, channel::TelegramConfig,
    },
    notification::{
        ChannelDispatcher, ChannelProvider, DeliveryStatus, build_provider,
        error::NotificationError,
    },
    test_helpers::RecordingProvider,
};
use serde_json::json;

const PLAIN_BODY: &str = r#""text":"(?:[^"\\]|\\.)*","disable_web_page_preview""#;

fn message() -> RenderedMessage {
    RenderedMessage::new("🚂 <b>#12951</b> <i>SUF</i> | NDLS-BCT | Delay: 5 mins")
}

fn direct(address: &str) -> Destination {
    Destination { address: address.to_string(), kind: DestinationKind::Direct }
}

#[tokio::test]
async fn test_telegram_fallback_and_partial_failure() {
    let mut server = mockito::Server::new_async().await;
    let path = "/bot123:abc/sendMessage";

    let rich_rejected = server
        .mock("POST", path)
        .match_body(Matcher::PartialJson(json!({"chat_id": "111", "parse_mode": "HTML"})))
        .with_status(400)
        .with_body(r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#)
        .expect(1)
        .create_async()
        .await;
    let plain_accepted = server
        .mock("POST", path)
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"chat_id": "111", "text": "🚂 #12951 SUF | NDLS-BCT | Delay: 5 mins"})),
            Matcher::Regex(PLAIN_BODY.to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;
    let always_down = server
        .mock("POST", path)
        .match_body(Matcher::PartialJson(json!({"chat_id": "222"})))
        .with_status(500)
        .expect(2)
        .create_async()
        .await;
    let broadcast_ok = server
        .mock("POST", path)
        .match_body(Matcher::PartialJson(json!({"chat_id": "@trains", "parse_mode": "HTML"})))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .expect(1)
        .create_async()
        .await;

    let channel = ChannelConfig {
        name: "telegram".to_string(),
        config: ChannelTypeConfig::Telegram(TelegramConfig {
            token: "123:abc".to_string(),
            api_base: server.url(),
            disable_web_preview: None,
            retry_policy: HttpRetryConfig::no_retries(),
        }),
        recipients: vec!["111".to_string(), "222".to_string()],
        broadcast: Some("@trains".to_string()),
    };
    channel.validate().unwrap();

    let pool = HttpClientPool::new(BaseHttpClientConfig::default());
    let provider = build_provider(&channel, &pool).await.unwrap();
    let dispatcher = ChannelDispatcher::new(Duration::from_secs(5)).with_route(
        &channel.name,
        provider,
        channel.destinations(),
    );

    let report = dispatcher.dispatch(&message()).await;

    assert!(report.overall_success());
    assert_eq!(report.delivered_count(), 2);
    assert_eq!(report.failed_count(), 1);

    let outcome = |address: &str| report.outcomes.iter().find(|o| o.destination == address).unwrap();
    assert_eq!(outcome("111").status, DeliveryStatus::Delivered(MessageFormat::Plain));
    assert_eq!(outcome("111").attempts, 2);
    assert!(matches!(outcome("222").status, DeliveryStatus::Failed(_)));
    assert_eq!(outcome("222").attempts, 2);
    assert_eq!(outcome("@trains").status, DeliveryStatus::Delivered(MessageFormat::Rich));
    assert_eq!(outcome("@trains").kind, DestinationKind::Broadcast);

    rich_rejected.assert_async().await;
    plain_accepted.assert_async().await;
    always_down.assert_async().await;
    broadcast_ok.assert_async().await;
}

#[tokio::test]
async fn test_rich_rejection_gets_exactly_one_plain_retry() {
    let provider = Arc::new(RecordingProvider::new().rejecting_rich());
    let dispatcher = ChannelDispatcher::new(Duration::from_secs(1)).with_route(
        "recording",
        provider.clone(),
        vec![direct("a")],
    );

    let report = dispatcher.dispatch(&message()).await;

    assert!(report.overall_success());
    let formats: Vec<_> = provider.sent().into_iter().map(|m| m.format).collect();
    assert_eq!(formats, vec![MessageFormat::Rich, MessageFormat::Plain]);
    assert!(!provider.sent()[1].text.contains('<'));
}

#[tokio::test]
async fn test_broken_recipient_never_masks_broadcast() {
    let provider = Arc::new(RecordingProvider::new().failing_for("broken"));
    let dispatcher = ChannelDispatcher::new(Duration::from_secs(1)).with_route(
        "recording",
        provider.clone(),
        vec![
            direct("broken"),
            Destination { address: "@all".to_string(), kind: DestinationKind::Broadcast },
        ],
    );

    let report = dispatcher.dispatch(&message()).await;

    assert!(report.overall_success());
    assert_eq!(provider.sent_to("broken").len(), 2);
    assert_eq!(provider.sent_to("@all").len(), 1);
}

struct StalledProvider;

#[async_trait]
impl ChannelProvider for StalledProvider {
    async fn send(
        &self,
        _destination: &str,
        _text: &str,
        _format: MessageFormat,
    ) -> Result<(), NotificationError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

#[tokio::test]
async fn test_stalled_destination_is_bounded_by_send_timeout() {
    let recording = Arc::new(RecordingProvider::new());
    let dispatcher = ChannelDispatcher::new(Duration::from_millis(50))
        .with_route("stalled", Arc::new(StalledProvider), vec![direct("slow")])
        .with_route("recording", recording.clone(), vec![direct("fast")]);

    let report = tokio::time::timeout(Duration::from_secs(5), dispatcher.dispatch(&message()))
        .await
        .expect("dispatch must not hang on a stalled destination");

    assert!(report.overall_success());
    let slow = report.outcomes.iter().find(|o| o.destination == "slow").unwrap();
    assert_eq!(slow.attempts, 2);
    assert!(matches!(slow.status, DeliveryStatus::Failed(_)));
    assert_eq!(recording.sent_to("fast").len(), 1);
}
