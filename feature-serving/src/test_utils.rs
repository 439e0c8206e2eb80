use async_trait::async_trait;
use prost::Message;
use prost_types::Timestamp;
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::ServingError;
use crate::keys::build_keys;
use crate::proto::{self, FeatureRow, Field};
use crate::refs::feature_set_ref;
use crate::specs::SpecService;
use crate::types::{
    EntityRow, FeatureReference, FeatureSetRequest, FeatureSetSpec, FeatureSpec, Value, ValueType,
};

pub fn random_string(prefix: &str, length: usize) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, suffix)
}

pub fn create_feature_set(
    project: &str,
    name: &str,
    entities: &[&str],
    features: &[(&str, ValueType)],
    max_age_seconds: u64,
) -> FeatureSetSpec {
    FeatureSetSpec {
        project: project.to_string(),
        name: name.to_string(),
        version: 1,
        entities: entities.iter().map(|e| e.to_string()).collect(),
        features: features
            .iter()
            .map(|(name, value_type)| FeatureSpec {
                name: name.to_string(),
                value_type: *value_type,
            })
            .collect(),
        max_age_seconds,
    }
}

/// A compact row as the ingestion path writes it. `values` must follow the
/// feature names in sorted order.
pub fn compact_row(event_seconds: i64, values: Vec<Option<Value>>) -> FeatureRow {
    FeatureRow {
        fields: values
            .into_iter()
            .map(|value| Field {
                name: String::new(),
                value: value.map(proto::Value::from),
            })
            .collect(),
        event_timestamp: Some(Timestamp {
            seconds: event_seconds,
            nanos: 0,
        }),
        feature_set: String::new(),
        ingestion_id: random_string("ingestion-", 8),
    }
}

/// An expanded row carrying its own field names and feature set reference.
pub fn expanded_row(
    spec: &FeatureSetSpec,
    event_seconds: i64,
    fields: Vec<(&str, Value)>,
) -> FeatureRow {
    FeatureRow {
        fields: fields
            .into_iter()
            .map(|(name, value)| Field {
                name: name.to_string(),
                value: Some(value.into()),
            })
            .collect(),
        event_timestamp: Some(Timestamp {
            seconds: event_seconds,
            nanos: 0,
        }),
        feature_set: feature_set_ref(spec),
        ingestion_id: random_string("ingestion-", 8),
    }
}

/// The (key, value) bytes under which `row` is stored for `entity_row`.
pub fn stored_entry(
    entity_row: &EntityRow,
    spec: &FeatureSetSpec,
    row: &FeatureRow,
) -> (Vec<u8>, Vec<u8>) {
    let key = build_keys(std::slice::from_ref(entity_row), spec)
        .expect("entity row carries every entity of the feature set")
        .remove(0);
    (key.encode_to_vec(), row.encode_to_vec())
}

/// Resolves every request to the same preset grouping, whatever references
/// were asked for.
pub struct FixedSpecService {
    feature_sets: Vec<FeatureSetRequest>,
}

impl FixedSpecService {
    pub fn new(feature_sets: Vec<FeatureSetRequest>) -> Self {
        Self { feature_sets }
    }

    pub fn single(spec: FeatureSetSpec, references: Vec<FeatureReference>) -> Self {
        Self::new(vec![FeatureSetRequest {
            spec,
            feature_references: references,
        }])
    }
}

#[async_trait]
impl SpecService for FixedSpecService {
    async fn get_feature_sets(
        &self,
        _references: &[FeatureReference],
    ) -> Result<Vec<FeatureSetRequest>, ServingError> {
        Ok(self.feature_sets.clone())
    }
}
