//! The seam between the dispatcher and concrete delivery channels.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::NotificationError;
use crate::models::MessageFormat;

/// A delivery channel able to send a text to one destination.
///
/// Implementations hold a long-lived client and never retry at the content
/// level; the rich-then-plain fallback belongs to the dispatcher.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Sends `text` to `destination`.
    ///
    /// With [`MessageFormat::Rich`] the text carries inline markup the
    /// provider renders or converts; with [`MessageFormat::Plain`] it is sent
    /// verbatim.
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotificationError>;
}
