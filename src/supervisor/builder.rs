//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::{
    config::AppConfig,
    engine::{AlertManager, EligibilityPolicy, PreferencesHandle, Scheduler, SchedulerSettings},
    http_client::HttpClientPool,
    models::Destination,
    notification::{ChannelDispatcher, ChannelProvider, build_provider},
    persistence::{JsonFileKnownSetStore, traits::KnownSetStore},
    providers::{HttpSnapshotSource, SnapshotSource},
};

struct ProvidedRoute {
    name: String,
    provider: Arc<dyn ChannelProvider>,
    destinations: Vec<Destination>,
}

/// A builder for creating a `Supervisor` instance.
///
/// Only the configuration is required. The snapshot source and the
/// known-set store default to the HTTP source and the JSON file named in the
/// configuration; channel providers are built from `config.channels`, and
/// extra pre-built routes can be added with [`SupervisorBuilder::route`].
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    store: Option<Arc<dyn KnownSetStore>>,
    source: Option<Arc<dyn SnapshotSource>>,
    client_pool: Option<Arc<HttpClientPool>>,
    routes: Vec<ProvidedRoute>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the known-set store.
    pub fn store(mut self, store: Arc<dyn KnownSetStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Overrides the snapshot source.
    pub fn source(mut self, source: Arc<dyn SnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the HTTP client pool shared by all HTTP-based components.
    pub fn client_pool(mut self, client_pool: Arc<HttpClientPool>) -> Self {
        self.client_pool = Some(client_pool);
        self
    }

    /// Adds a pre-built channel route next to the configured ones.
    pub fn route(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn ChannelProvider>,
        destinations: Vec<Destination>,
    ) -> Self {
        self.routes.push(ProvidedRoute { name: name.into(), provider, destinations });
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// Invalid channels are skipped with a warning; if none remain the
    /// build fails with [`SupervisorError::NoUsableChannel`].
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let client_pool = self
            .client_pool
            .unwrap_or_else(|| Arc::new(HttpClientPool::new(config.http_base_config.clone())));

        let mut dispatcher = ChannelDispatcher::new(config.send_timeout);
        for channel in &config.channels {
            if let Err(e) = channel.validate() {
                tracing::warn!(channel = %channel.name, error = %e, "Skipping invalid channel.");
                continue;
            }
            match build_provider(channel, &client_pool).await {
                Ok(provider) => {
                    let destinations = channel.destinations();
                    tracing::info!(
                        channel = %channel.name,
                        kind = channel.config.kind(),
                        destinations = destinations.len(),
                        "Channel configured."
                    );
                    dispatcher.add_route(channel.name.clone(), provider, destinations);
                }
                Err(e) => {
                    tracing::warn!(channel = %channel.name, error = %e, "Skipping channel that could not be built.");
                }
            }
        }
        for route in self.routes {
            dispatcher.add_route(route.name, route.provider, route.destinations);
        }
        if dispatcher.destination_count() == 0 {
            return Err(SupervisorError::NoUsableChannel);
        }

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(JsonFileKnownSetStore::new(&config.known_set_path)));
        let source = match self.source {
            Some(source) => source,
            None => {
                let client = client_pool.get_or_create(&config.http_retry_config).await?;
                Arc::new(HttpSnapshotSource::new(
                    client,
                    config.snapshot.url.clone(),
                    config.snapshot.id_field.clone(),
                    config.snapshot.timeout,
                ))
            }
        };

        let known = store.load().await;
        tracing::info!(count = known.len(), "Loaded known set.");

        let preferences = PreferencesHandle::new(config.preferences.clone());
        let policy = EligibilityPolicy::new(preferences.clone(), Utc::now());
        let alerts = AlertManager::new(policy, Arc::new(dispatcher));
        let cancellation_token = CancellationToken::new();
        let scheduler = Scheduler::new(
            SchedulerSettings::from(&config),
            source,
            store,
            alerts,
            known,
            cancellation_token.clone(),
        );

        Ok(Supervisor::new(config, scheduler, preferences, cancellation_token))
    }
}
