//! Retrying HTTP clients shared by the snapshot source and channel providers.

mod client;
mod pool;

pub use client::create_retryable_http_client;
pub use pool::{HttpClientPool, HttpClientPoolError};
