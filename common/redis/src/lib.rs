use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

// Callers build errors from a kind in tests and decide on retries from the method.
pub use redis::ErrorKind as RedisErrorKind;
pub use redis::RetryMethod;

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl CustomRedisError {
    /// Build a Redis error of the given kind without a live connection.
    pub fn from_redis_kind(kind: redis::ErrorKind, description: &'static str) -> Self {
        CustomRedisError::Redis(Arc::new(redis::RedisError::from((kind, description))))
    }

    fn is_config_error(err: &redis::RedisError) -> bool {
        matches!(
            err.kind(),
            redis::ErrorKind::InvalidClientConfig | redis::ErrorKind::AuthenticationFailed
        )
    }

    /// How a failed read should be retried. Bad configuration and rejected
    /// credentials never succeed on retry; everything else follows the redis
    /// crate's classification.
    pub fn retry_method(&self) -> RetryMethod {
        match self {
            CustomRedisError::Timeout => RetryMethod::WaitAndRetry,
            CustomRedisError::InvalidConfiguration(_) => RetryMethod::NoRetry,
            CustomRedisError::Redis(err) => {
                if Self::is_config_error(err) {
                    RetryMethod::NoRetry
                } else {
                    err.retry_method()
                }
            }
        }
    }
}

/// Binary-safe access to a key-value cache.
///
/// Keys and values are raw bytes: the feature store writes protobuf-encoded keys,
/// so nothing here assumes UTF-8.
#[async_trait]
pub trait Client {
    /// Fetch many keys in a single round trip.
    ///
    /// The result has the same length and order as `keys`; `None` marks a key with
    /// no stored value. Only transport or command failures are errors.
    async fn mget(&self, keys: Vec<Vec<u8>>) -> Result<Vec<Option<Vec<u8>>>, CustomRedisError>;
}

mod client;
mod cluster;
mod mock;

pub use client::RedisClient;
pub use cluster::RedisClusterClient;
pub use mock::{MockRedisCall, MockRedisClient};

/// Reject `Some(Duration::ZERO)` timeouts; `None` is the way to ask for no timeout.
pub(crate) fn validate_timeout(
    timeout: Option<std::time::Duration>,
    what: &str,
) -> Result<(), CustomRedisError> {
    match timeout {
        Some(t) if t.is_zero() => Err(CustomRedisError::InvalidConfiguration(format!(
            "Redis {what} timeout cannot be Duration::ZERO - use None for no timeout"
        ))),
        _ => Ok(()),
    }
}
