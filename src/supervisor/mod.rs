//! The Supervisor module manages the lifecycle of the railwatch service.
//!
//! ## Responsibilities
//!
//! - **Initialization**: the `SupervisorBuilder` validates the configured
//!   channels, builds one long-lived provider per channel and wires the
//!   snapshot source, known-set store and scheduler together. A
//!   configuration without a single usable channel is refused here, before
//!   the loop ever starts.
//! - **Lifecycle Management**: the `Supervisor` announces startup, runs the
//!   scheduler and listens for shutdown signals (Ctrl+C or SIGTERM).
//! - **Graceful Shutdown**: the iteration in flight is completed, then a
//!   dirty known set is flushed within the configured shutdown timeout.

mod builder;

use std::sync::Arc;

pub use builder::SupervisorBuilder;
use chrono::Local;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::{PreferencesHandle, Scheduler},
    http_client::HttpClientPoolError,
};

/// Represents the set of errors that can occur while building or running
/// the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// None of the configured channels can deliver messages.
    #[error("No usable notification channel configured")]
    NoUsableChannel,

    /// An HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    /// Shared application configuration.
    config: Arc<AppConfig>,

    /// The poll loop.
    scheduler: Scheduler,

    /// Live notification preferences.
    preferences: PreferencesHandle,

    /// A token used to signal a graceful shutdown.
    cancellation_token: CancellationToken,

    /// Background tasks (the signal handler).
    join_set: tokio::task::JoinSet<()>,
}

impl Supervisor {
    /// Creates a new Supervisor instance. Usually called by the
    /// `SupervisorBuilder`.
    pub fn new(
        config: AppConfig,
        scheduler: Scheduler,
        preferences: PreferencesHandle,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config: Arc::new(config),
            scheduler,
            preferences,
            cancellation_token,
            join_set: tokio::task::JoinSet::new(),
        }
    }

    /// Returns a new `SupervisorBuilder` instance.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// The token that stops the service when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Handle for replacing notification preferences while running.
    pub fn preferences(&self) -> PreferencesHandle {
        self.preferences.clone()
    }

    /// The scheduler, for inspection.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Starts the service and runs until a shutdown signal arrives.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();

        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                _ = cancellation_token.cancelled() => {}
            }

            cancellation_token.cancel();
        });

        tracing::info!(
            poll_interval = ?self.config.poll_interval,
            known = self.scheduler.known().len(),
            "railwatch started."
        );
        if self.config.startup_notice {
            self.scheduler
                .alerts()
                .send_startup_notice(self.config.poll_interval, Local::now())
                .await;
        }

        self.scheduler.run().await;

        self.join_set.shutdown().await;

        tracing::info!("Starting graceful resource cleanup...");
        let shutdown_timeout = self.config.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, self.scheduler.flush()).await {
            Ok(Ok(())) => tracing::info!("Cleanup completed successfully."),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Failed to flush known set during shutdown.")
            }
            Err(_) => tracing::warn!(
                "Cleanup did not complete within the timeout of {:?}. Continuing shutdown.",
                shutdown_timeout
            ),
        }

        tracing::info!("Supervisor shutdown complete.");
        Ok(())
    }
}
