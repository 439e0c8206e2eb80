use tracing::instrument;

use crate::decoder::FeatureRowDecoder;
use crate::errors::ServingError;
use crate::keys::build_keys;
use crate::proto::FeatureRow;
use crate::refs::feature_set_ref;
use crate::store::OnlineStoreClient;
use crate::types::{EntityRow, FeatureSetRequest};

/// Fetches and decodes the stored rows of one feature set for a batch of entity rows.
#[derive(Clone)]
pub struct OnlineRetriever {
    store: OnlineStoreClient,
}

impl OnlineRetriever {
    pub fn new(store: OnlineStoreClient) -> Self {
        Self { store }
    }

    /// Returns one slot per entity row, in row order. `None` means nothing is
    /// stored for that row's entities.
    #[instrument(skip_all, fields(feature_set = %feature_set_ref(&request.spec), rows = entity_rows.len()))]
    pub async fn get_online_features(
        &self,
        entity_rows: &[EntityRow],
        request: &FeatureSetRequest,
    ) -> Result<Vec<Option<FeatureRow>>, ServingError> {
        let keys = build_keys(entity_rows, &request.spec)?;
        let values = self.store.batch_get(&keys).await?;

        let decoder = FeatureRowDecoder::new(feature_set_ref(&request.spec), &request.spec);
        values
            .into_iter()
            .zip(&keys)
            .map(|(bytes, key)| decoder.decode_bytes(bytes, key))
            .collect()
    }
}
