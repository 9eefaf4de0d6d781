//! Error types for the notification service.

use std::time::Duration;

use thiserror::Error;

use crate::{http_client::HttpClientPoolError, models::channel::ChannelConfigError};

/// Defines the possible errors that can occur within the notification service.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An error related to invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ChannelConfigError),

    /// The provider answered but refused the message.
    #[error("Provider rejected message with status {status}: {description}")]
    Rejected {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider-supplied reason, possibly empty.
        description: String,
    },

    /// An error indicating that the notification failed to be sent.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// The send did not complete within the configured bound.
    #[error("Send timed out after {0:?}")]
    Timeout(Duration),

    /// An internal error that should not occur under normal circumstances.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// An error originating from the HTTP client pool.
    #[error("HTTP client error")]
    HttpClientError(#[from] HttpClientPoolError),

    /// An error from the underlying `reqwest` or `reqwest_middleware`
    /// libraries.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest_middleware::Error),
}

impl NotificationError {
    /// Builds a [`NotificationError::Rejected`] from a failed response.
    pub(crate) async fn rejected(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let description = response.text().await.unwrap_or_default();
        Self::Rejected { status, description }
    }
}
