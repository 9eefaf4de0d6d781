//! Retrying HTTP client construction.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{Jitter, RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{HttpRetryConfig, JitterSetting};

/// Wraps `base_client` with exponential-backoff retries for transient
/// failures (connect errors, 5xx, 429), as described by `config`.
pub fn create_retryable_http_client(
    config: &HttpRetryConfig,
    base_client: reqwest::Client,
) -> ClientWithMiddleware {
    let jitter = match config.jitter {
        JitterSetting::None => Jitter::None,
        JitterSetting::Full => Jitter::Full,
    };

    let retry_policy = ExponentialBackoff::builder()
        .jitter(jitter)
        .base(config.base_for_backoff)
        .retry_bounds(config.initial_backoff_ms, config.max_backoff_secs)
        .build_with_max_retries(config.max_retries);

    ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}
