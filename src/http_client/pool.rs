//! A reusable, thread-safe pool of HTTP clients.
//!
//! The snapshot source and every HTTP channel provider ask the pool for a
//! client carrying their retry policy. Providers sharing a policy share a
//! client, and therefore its connection pool.

use super::client::create_retryable_http_client;
use crate::config::{BaseHttpClientConfig, HttpRetryConfig};
use reqwest::Client as ReqwestClient;
use reqwest_middleware::ClientWithMiddleware;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur within the `HttpClientPool`.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// An error occurred while building the underlying `reqwest::Client`.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// A pool of retrying HTTP clients keyed by their `HttpRetryConfig`.
pub struct HttpClientPool {
    base_config: BaseHttpClientConfig,
    clients: RwLock<HashMap<HttpRetryConfig, Arc<ClientWithMiddleware>>>,
}

impl HttpClientPool {
    /// Creates a new, empty pool whose clients use `base_config`.
    pub fn new(base_config: BaseHttpClientConfig) -> Self {
        Self { base_config, clients: RwLock::new(HashMap::new()) }
    }

    /// Gets the client for `retry_policy`, creating it on first use.
    ///
    /// Uses a double-checked read/write lock so concurrent callers with the
    /// same policy end up with one client.
    pub async fn get_or_create(
        &self,
        retry_policy: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        if let Some(client) = self.clients.read().await.get(retry_policy) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(retry_policy) {
            return Ok(client.clone());
        }

        let base_client = ReqwestClient::builder()
            .pool_max_idle_per_host(self.base_config.max_idle_per_host)
            .pool_idle_timeout(Some(self.base_config.idle_timeout))
            .connect_timeout(self.base_config.connect_timeout)
            .build()
            .map_err(|e| HttpClientPoolError::HttpClientBuildError(e.to_string()))?;

        let new_client = Arc::new(create_retryable_http_client(retry_policy, base_client));
        clients.insert(retry_policy.clone(), new_client.clone());
        tracing::debug!(?retry_policy, "Created HTTP client.");

        Ok(new_client)
    }

    /// Returns the number of clients in the pool.
    #[cfg(test)]
    pub async fn get_active_client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new(BaseHttpClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_reuses_client_per_policy() {
        let pool = HttpClientPool::default();
        assert_eq!(pool.get_active_client_count().await, 0);

        let retry_config = HttpRetryConfig::default();
        let client1 = pool.get_or_create(&retry_config).await.unwrap();
        let client2 = pool.get_or_create(&retry_config).await.unwrap();

        assert!(Arc::ptr_eq(&client1, &client2));
        assert_eq!(pool.get_active_client_count().await, 1);
    }

    #[tokio::test]
    async fn test_pool_separates_policies() {
        let pool = HttpClientPool::default();
        let client1 = pool.get_or_create(&HttpRetryConfig::default()).await.unwrap();
        let client2 = pool.get_or_create(&HttpRetryConfig::no_retries()).await.unwrap();

        assert!(!Arc::ptr_eq(&client1, &client2));
        assert_eq!(pool.get_active_client_count().await, 2);
    }

    #[tokio::test]
    async fn test_pool_concurrent_access() {
        let pool = Arc::new(HttpClientPool::default());
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.get_or_create(&HttpRetryConfig::default()).await })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert!(result.unwrap().is_ok());
        }
        assert_eq!(pool.get_active_client_count().await, 1);
    }
}
