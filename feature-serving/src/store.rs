use std::sync::Arc;

use common_redis::{Client, CustomRedisError, RedisClient, RedisClusterClient, RedisErrorKind};
use prost::Message;
use tracing::instrument;

use crate::config::Config;
use crate::errors::ServingError;
use crate::proto::RedisKey;

/// Batched reads against the online store.
///
/// One call is one MGET round trip, so callers issue one call per feature set
/// per request rather than one per entity row.
#[derive(Clone)]
pub struct OnlineStoreClient {
    client: Arc<dyn Client + Send + Sync>,
}

impl OnlineStoreClient {
    pub fn new(client: Arc<dyn Client + Send + Sync>) -> Self {
        Self { client }
    }

    /// Connect to the store described by the config: a cluster when cluster mode
    /// is on or more than one node is listed, a single node otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, ServingError> {
        let nodes = config.redis_nodes();
        let response_timeout = config.redis_response_timeout();
        let connection_timeout = config.redis_connection_timeout();

        let client: Arc<dyn Client + Send + Sync> = if *config.redis_cluster_mode
            || nodes.len() > 1
        {
            tracing::info!(nodes = nodes.len(), "connecting to redis cluster");
            Arc::new(
                RedisClusterClient::with_config(nodes, response_timeout, connection_timeout)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to create Redis cluster client: {}", e);
                        ServingError::StoreUnavailable(e)
                    })?,
            )
        } else {
            let url = nodes.into_iter().next().ok_or_else(|| {
                ServingError::InvalidConfiguration("REDIS_URL is empty".to_string())
            })?;
            Arc::new(
                RedisClient::with_config(url, response_timeout, connection_timeout)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to create Redis client: {}", e);
                        ServingError::StoreUnavailable(e)
                    })?,
            )
        };

        Ok(Self::new(client))
    }

    /// Fetch the stored bytes for every key.
    ///
    /// The result is index-aligned with `keys`; `None` is a miss. A failure of
    /// the batch call itself fails the whole batch.
    #[instrument(skip_all, fields(keys = keys.len()))]
    pub async fn batch_get(&self, keys: &[RedisKey]) -> Result<Vec<Option<Vec<u8>>>, ServingError> {
        if keys.is_empty() {
            return Ok(vec![]);
        }

        let binary_keys: Vec<Vec<u8>> = keys.iter().map(Message::encode_to_vec).collect();

        let values = self.client.mget(binary_keys).await.map_err(|e| {
            match &e {
                CustomRedisError::Timeout => {
                    tracing::warn!("Timed out fetching feature rows from redis");
                }
                _ => {
                    tracing::error!("Unable to retrieve feature rows from redis: {}", e);
                }
            }
            ServingError::StoreUnavailable(e)
        })?;

        if values.len() != keys.len() {
            tracing::error!(
                expected = keys.len(),
                received = values.len(),
                "redis returned a misaligned MGET reply"
            );
            return Err(ServingError::StoreUnavailable(
                CustomRedisError::from_redis_kind(
                    RedisErrorKind::ResponseError,
                    "MGET reply length does not match request",
                ),
            ));
        }

        // an empty value is treated the same as no value
        Ok(values
            .into_iter()
            .map(|value| value.filter(|bytes| !bytes.is_empty()))
            .collect())
    }
}
