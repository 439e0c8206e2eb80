use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tracing::instrument;

use crate::assembler::assemble;
use crate::config::Config;
use crate::errors::ServingError;
use crate::metrics_consts::{
    ENTITY_ROWS_PER_REQUEST, FEATURE_REFERENCES_PER_REQUEST, FEATURE_SETS_PER_REQUEST,
    MISSING_FEATURE_COUNTER, ONLINE_FEATURES_ERROR_COUNTER, ONLINE_FEATURES_LATENCY,
    ONLINE_FEATURES_REQUEST_COUNTER, STALE_FEATURE_COUNTER,
};
use crate::proto::FeatureRow;
use crate::retriever::OnlineRetriever;
use crate::specs::{SpecService, StaticSpecService};
use crate::store::OnlineStoreClient;
use crate::types::{FeatureSetRequest, GetOnlineFeaturesRequest, GetOnlineFeaturesResponse};

/// Serves online feature requests end to end: resolve references, fetch every
/// feature set concurrently, then assemble one record per entity row.
#[derive(Clone)]
pub struct OnlineServingService {
    retriever: OnlineRetriever,
    specs: Arc<dyn SpecService + Send + Sync>,
    request_timeout: Option<Duration>,
}

impl OnlineServingService {
    pub fn new(
        retriever: OnlineRetriever,
        specs: Arc<dyn SpecService + Send + Sync>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            retriever,
            specs,
            request_timeout,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self, ServingError> {
        let specs = StaticSpecService::from_json_file(
            Path::new(&config.feature_sets_path),
            config.default_project.clone(),
        )?;
        let store = OnlineStoreClient::from_config(config).await?;

        Ok(Self::new(
            OnlineRetriever::new(store),
            Arc::new(specs),
            config.request_timeout(),
        ))
    }

    pub async fn get_online_features(
        &self,
        request: &GetOnlineFeaturesRequest,
    ) -> Result<GetOnlineFeaturesResponse, ServingError> {
        self.get_online_features_with_deadline(request, self.request_timeout)
            .await
    }

    /// Like [`Self::get_online_features`], with a caller-supplied deadline in
    /// place of the configured one. `None` waits for the store indefinitely.
    #[instrument(
        skip_all,
        fields(features = request.features.len(), entity_rows = request.entity_rows.len())
    )]
    pub async fn get_online_features_with_deadline(
        &self,
        request: &GetOnlineFeaturesRequest,
        deadline: Option<Duration>,
    ) -> Result<GetOnlineFeaturesResponse, ServingError> {
        let start = Instant::now();
        metrics::counter!(ONLINE_FEATURES_REQUEST_COUNTER).increment(1);

        let result = self.serve(request, deadline).await;

        metrics::histogram!(ONLINE_FEATURES_LATENCY)
            .record(start.elapsed().as_secs_f64() * 1000.0);
        if let Err(e) = &result {
            metrics::counter!(ONLINE_FEATURES_ERROR_COUNTER, "error" => e.error_code())
                .increment(1);
            if e.is_client_error() {
                tracing::debug!("Rejected online features request: {}", e);
            } else {
                tracing::error!("Failed to serve online features: {}", e);
            }
        }
        result
    }

    async fn serve(
        &self,
        request: &GetOnlineFeaturesRequest,
        deadline: Option<Duration>,
    ) -> Result<GetOnlineFeaturesResponse, ServingError> {
        if request.features.is_empty() {
            return Err(ServingError::InvalidRequest(
                "at least one feature reference is required".to_string(),
            ));
        }

        metrics::histogram!(ENTITY_ROWS_PER_REQUEST).record(request.entity_rows.len() as f64);
        metrics::histogram!(FEATURE_REFERENCES_PER_REQUEST)
            .record(request.features.len() as f64);

        let feature_sets = self.specs.get_feature_sets(&request.features).await?;
        metrics::histogram!(FEATURE_SETS_PER_REQUEST).record(feature_sets.len() as f64);

        let groups = self.fetch_all(request, feature_sets, deadline).await?;

        let assembled = assemble(request, &groups, chrono::Utc::now().timestamp());
        metrics::counter!(MISSING_FEATURE_COUNTER).increment(assembled.missing_fields);
        metrics::counter!(STALE_FEATURE_COUNTER).increment(assembled.stale_fields);

        Ok(assembled.response)
    }

    async fn fetch_all(
        &self,
        request: &GetOnlineFeaturesRequest,
        feature_sets: Vec<FeatureSetRequest>,
        deadline: Option<Duration>,
    ) -> Result<Vec<(FeatureSetRequest, Vec<Option<FeatureRow>>)>, ServingError> {
        let fetches = feature_sets.into_iter().map(|feature_set| async move {
            let rows = self
                .retriever
                .get_online_features(&request.entity_rows, &feature_set)
                .await?;
            Ok::<_, ServingError>((feature_set, rows))
        });

        // a failed or slow group fails the whole request
        match deadline {
            Some(deadline) => tokio::time::timeout(deadline, try_join_all(fetches))
                .await
                .map_err(|_| {
                    tracing::warn!(
                        deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                        "Deadline exceeded while fetching feature rows"
                    );
                    ServingError::Timeout
                })?,
            None => try_join_all(fetches).await,
        }
    }
}
