//! # Notification Service
//!
//! Delivers rendered messages to every configured channel destination.
//!
//! ## Core Components
//!
//! - **`ChannelDispatcher`**: holds one route per configured channel (a
//!   long-lived [`ChannelProvider`] plus its destinations) and fans a message
//!   out to all of them concurrently.
//! - **`ChannelProvider`**: the adapter seam. Telegram, Twilio (SMS and
//!   WhatsApp) and a generic webhook implement it.
//! - **`MessageFormatter`**: renders events and service notices.
//!
//! ## Delivery contract
//!
//! Each destination first receives the rich form of the message. If that
//! attempt fails or exceeds the send timeout, exactly one plain-text attempt
//! follows on the same destination. Destinations never affect each other, and
//! the dispatch as a whole succeeds when at least one destination succeeded.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;

use crate::{
    http_client::HttpClientPool,
    models::{
        ChannelConfig, ChannelTypeConfig, Destination, DestinationKind, MessageFormat,
        RenderedMessage,
    },
};

pub mod error;
pub mod formatter;
pub mod telegram;
pub mod traits;
pub mod twilio;
pub mod webhook;

use error::NotificationError;
pub use formatter::MessageFormatter;
use telegram::TelegramProvider;
pub use traits::ChannelProvider;
use twilio::{TwilioChannel, TwilioProvider};
use webhook::WebhookProvider;

/// How one destination fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Delivered, in the given format.
    Delivered(MessageFormat),
    /// Both attempts failed; holds the last error.
    Failed(String),
}

/// Per-destination result of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Name of the channel route.
    pub channel: String,
    /// Destination address.
    pub destination: String,
    /// Direct or broadcast.
    pub kind: DestinationKind,
    /// Final status.
    pub status: DeliveryStatus,
    /// Number of send attempts made, one or two.
    pub attempts: u8,
}

impl DeliveryOutcome {
    /// Returns `true` if either attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered(_))
    }
}

/// Aggregated result of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// One entry per attempted destination.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    /// At-least-one-success across all destinations.
    pub fn overall_success(&self) -> bool {
        self.outcomes.iter().any(DeliveryOutcome::is_success)
    }

    /// Destinations that received the message.
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Destinations that did not.
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.delivered_count()
    }
}

struct ChannelRoute {
    name: String,
    provider: Arc<dyn ChannelProvider>,
    destinations: Vec<Destination>,
}

/// Fans messages out to every configured destination.
pub struct ChannelDispatcher {
    routes: Vec<ChannelRoute>,
    send_timeout: Duration,
}

impl ChannelDispatcher {
    /// Creates a dispatcher with no routes. Every single send attempt is
    /// bounded by `send_timeout`.
    pub fn new(send_timeout: Duration) -> Self {
        Self { routes: Vec::new(), send_timeout }
    }

    /// Registers a channel and its destinations.
    pub fn add_route(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn ChannelProvider>,
        destinations: Vec<Destination>,
    ) {
        self.routes.push(ChannelRoute { name: name.into(), provider, destinations });
    }

    /// Builder-style [`ChannelDispatcher::add_route`].
    pub fn with_route(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn ChannelProvider>,
        destinations: Vec<Destination>,
    ) -> Self {
        self.add_route(name, provider, destinations);
        self
    }

    /// Number of destinations across all channels.
    pub fn destination_count(&self) -> usize {
        self.routes.iter().map(|r| r.destinations.len()).sum()
    }

    /// Sends `message` to every destination of every route.
    ///
    /// All destinations are attempted concurrently and the call returns once
    /// each has either succeeded or exhausted its two bounded attempts.
    pub async fn dispatch(&self, message: &RenderedMessage) -> DispatchReport {
        let deliveries = self.routes.iter().flat_map(|route| {
            route.destinations.iter().map(move |destination| self.deliver(route, destination, message))
        });
        let outcomes = join_all(deliveries).await;
        let report = DispatchReport { outcomes };

        tracing::debug!(
            delivered = report.delivered_count(),
            failed = report.failed_count(),
            "Dispatch finished."
        );
        report
    }

    async fn deliver(
        &self,
        route: &ChannelRoute,
        destination: &Destination,
        message: &RenderedMessage,
    ) -> DeliveryOutcome {
        let outcome = |status, attempts| DeliveryOutcome {
            channel: route.name.clone(),
            destination: destination.address.clone(),
            kind: destination.kind,
            status,
            attempts,
        };

        let rich_error =
            match self.attempt(route, destination, message.rich(), MessageFormat::Rich).await {
                Ok(()) => return outcome(DeliveryStatus::Delivered(MessageFormat::Rich), 1),
                Err(e) => e,
            };
        tracing::warn!(
            channel = %route.name,
            destination = %destination.address,
            error = %rich_error,
            "Rich send failed, retrying as plain text."
        );

        match self.attempt(route, destination, &message.plain(), MessageFormat::Plain).await {
            Ok(()) => outcome(DeliveryStatus::Delivered(MessageFormat::Plain), 2),
            Err(e) => {
                tracing::error!(
                    channel = %route.name,
                    destination = %destination.address,
                    error = %e,
                    "Plain-text send failed."
                );
                outcome(DeliveryStatus::Failed(e.to_string()), 2)
            }
        }
    }

    async fn attempt(
        &self,
        route: &ChannelRoute,
        destination: &Destination,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotificationError> {
        tokio::time::timeout(
            self.send_timeout,
            route.provider.send(&destination.address, text, format),
        )
        .await
        .map_err(|_| NotificationError::Timeout(self.send_timeout))?
    }
}

/// Builds the provider for a validated channel configuration, drawing its
/// HTTP client from `pool`.
pub async fn build_provider(
    config: &ChannelConfig,
    pool: &HttpClientPool,
) -> Result<Arc<dyn ChannelProvider>, NotificationError> {
    let provider: Arc<dyn ChannelProvider> = match &config.config {
        ChannelTypeConfig::Telegram(telegram) => {
            let client = pool.get_or_create(&telegram.retry_policy).await?;
            Arc::new(TelegramProvider::new(telegram, client))
        }
        ChannelTypeConfig::Sms(twilio) => {
            let client = pool.get_or_create(&twilio.retry_policy).await?;
            Arc::new(TwilioProvider::new(twilio, TwilioChannel::Sms, client)?)
        }
        ChannelTypeConfig::Whatsapp(twilio) => {
            let client = pool.get_or_create(&twilio.retry_policy).await?;
            Arc::new(TwilioProvider::new(twilio, TwilioChannel::WhatsApp, client)?)
        }
        ChannelTypeConfig::Webhook(webhook) => {
            let client = pool.get_or_create(&webhook.retry_policy).await?;
            Arc::new(WebhookProvider::new(webhook, client))
        }
    };
    Ok(provider)
}
