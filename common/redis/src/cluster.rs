use async_trait::async_trait;
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::{validate_timeout, Client, CustomRedisError};

/// Cluster-aware Redis client.
///
/// Keys are routed by hash slot. A multi-key MGET whose keys live on different
/// shards is split per slot by the redis crate and the replies are stitched back
/// into request order, so callers still see one aligned result list.
pub struct RedisClusterClient {
    connection: ClusterConnection,
}

impl RedisClusterClient {
    /// Connect to a cluster given any subset of its nodes.
    ///
    /// # Examples
    /// ```no_run
    /// use common_redis::RedisClusterClient;
    /// use std::time::Duration;
    ///
    /// # async fn example() {
    /// let client = RedisClusterClient::with_config(
    ///     vec![
    ///         "redis://10.0.0.1:6379".to_string(),
    ///         "redis://10.0.0.2:6379".to_string(),
    ///     ],
    ///     Some(Duration::from_millis(100)),
    ///     Some(Duration::from_millis(5000)),
    /// ).await.unwrap();
    /// # }
    /// ```
    pub async fn with_config(
        nodes: Vec<String>,
        response_timeout: Option<Duration>,
        connection_timeout: Option<Duration>,
    ) -> Result<RedisClusterClient, CustomRedisError> {
        if nodes.is_empty() {
            return Err(CustomRedisError::InvalidConfiguration(
                "Redis cluster needs at least one node".to_string(),
            ));
        }

        validate_timeout(response_timeout, "response")?;
        validate_timeout(connection_timeout, "connection")?;

        let mut builder = ClusterClientBuilder::new(nodes);

        if let Some(timeout) = response_timeout {
            builder = builder.response_timeout(timeout);
        }

        if let Some(timeout) = connection_timeout {
            builder = builder.connection_timeout(timeout);
        }

        let client = builder.build()?;
        let connection = client.get_async_connection().await?;

        Ok(RedisClusterClient { connection })
    }
}

#[async_trait]
impl Client for RedisClusterClient {
    async fn mget(&self, keys: Vec<Vec<u8>>) -> Result<Vec<Option<Vec<u8>>>, CustomRedisError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.connection.clone();
        let results: Vec<Option<Vec<u8>>> = conn.mget(&keys).await?;

        if results.len() != keys.len() {
            tracing::error!(
                expected = keys.len(),
                received = results.len(),
                "cluster MGET returned a misaligned reply"
            );
            return Err(CustomRedisError::from_redis_kind(
                redis::ErrorKind::ResponseError,
                "cluster MGET reply length does not match request",
            ));
        }

        Ok(results)
    }
}
