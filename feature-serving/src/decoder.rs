use prost::Message;

use crate::errors::ServingError;
use crate::proto::{FeatureRow, Field, RedisKey};
use crate::types::{FeatureSetSpec, FeatureSpec};

/// Reverses the compact encoding of stored feature rows for one feature set.
///
/// A compact row drops everything derivable from the feature set spec and the
/// lookup key: field names, entity fields and the feature set reference. Its
/// values are ordered by feature name. Rows written in the expanded form are
/// passed through untouched.
pub struct FeatureRowDecoder<'a> {
    feature_set_ref: String,
    sorted_features: Vec<&'a FeatureSpec>,
}

impl<'a> FeatureRowDecoder<'a> {
    pub fn new(feature_set_ref: String, spec: &'a FeatureSetSpec) -> Self {
        let mut sorted_features: Vec<&FeatureSpec> = spec.features.iter().collect();
        sorted_features.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            feature_set_ref,
            sorted_features,
        }
    }

    /// A row is compact when it carries no feature set reference and none of its
    /// fields are named.
    pub fn is_encoded(&self, row: &FeatureRow) -> bool {
        row.feature_set.is_empty() && row.fields.iter().all(|field| field.name.is_empty())
    }

    /// A compact row is valid when it was encoded against the same schema: one
    /// field per feature of the feature set, each value of the declared type or unset.
    pub fn is_encoding_valid(&self, row: &FeatureRow) -> bool {
        row.fields.len() == self.sorted_features.len()
            && row
                .fields
                .iter()
                .zip(&self.sorted_features)
                .all(|(field, feature)| {
                    field
                        .value
                        .as_ref()
                        .and_then(|value| value.val.as_ref())
                        .map_or(true, |val| feature.value_type.matches(val))
                })
    }

    /// Expand a valid compact row: name its fields from the feature set and put back the
    /// entity fields carried by the lookup key.
    pub fn decode(&self, row: FeatureRow, key: &RedisKey) -> FeatureRow {
        let mut fields: Vec<Field> = key.entities.clone();
        fields.extend(
            row.fields
                .into_iter()
                .zip(&self.sorted_features)
                .map(|(field, feature)| Field {
                    name: feature.name.clone(),
                    value: field.value,
                }),
        );

        FeatureRow {
            fields,
            event_timestamp: row.event_timestamp,
            feature_set: self.feature_set_ref.clone(),
            ingestion_id: row.ingestion_id,
        }
    }

    /// Produce the compact form of an expanded row. Fields that are not features
    /// of the feature set, entity fields included, are dropped.
    pub fn encode(&self, row: &FeatureRow) -> FeatureRow {
        let fields = self
            .sorted_features
            .iter()
            .map(|feature| Field {
                name: String::new(),
                value: row
                    .fields
                    .iter()
                    .find(|field| field.name == feature.name)
                    .and_then(|field| field.value.clone()),
            })
            .collect();

        FeatureRow {
            fields,
            event_timestamp: row.event_timestamp.clone(),
            feature_set: String::new(),
            ingestion_id: row.ingestion_id.clone(),
        }
    }

    /// Turn the bytes fetched for `key` into a feature row.
    ///
    /// `None` (nothing stored) stays `None`. Bytes that do not parse, or a compact
    /// row that does not match the feature set, are reported as corruption rather than
    /// as a miss.
    pub fn decode_bytes(
        &self,
        bytes: Option<Vec<u8>>,
        key: &RedisKey,
    ) -> Result<Option<FeatureRow>, ServingError> {
        let Some(bytes) = bytes else {
            return Ok(None);
        };

        let row = FeatureRow::decode(bytes.as_slice()).map_err(|e| {
            tracing::error!(
                feature_set = %self.feature_set_ref,
                "Unable to parse feature row retrieved from the online store: {}",
                e
            );
            self.corrupt(format!("invalid protobuf: {e}"))
        })?;

        if !self.is_encoded(&row) {
            return Ok(Some(row));
        }

        if !self.is_encoding_valid(&row) {
            tracing::error!(
                feature_set = %self.feature_set_ref,
                fields = row.fields.len(),
                features = self.sorted_features.len(),
                "Compact feature row does not match its feature set spec"
            );
            return Err(self.corrupt(format!(
                "compact row has {} fields, feature set has {} features",
                row.fields.len(),
                self.sorted_features.len()
            )));
        }

        Ok(Some(self.decode(row, key)))
    }

    fn corrupt(&self, reason: String) -> ServingError {
        ServingError::CorruptRow {
            feature_set: self.feature_set_ref.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::build_keys;
    use crate::proto::Value as ProtoValue;
    use crate::refs::feature_set_ref;
    use crate::types::{EntityRow, Value, ValueType};
    use prost_types::Timestamp;

    fn spec() -> FeatureSetSpec {
        FeatureSetSpec {
            project: "project".to_string(),
            name: "drivers".to_string(),
            version: 1,
            entities: vec!["driver_id".to_string()],
            features: vec![
                FeatureSpec {
                    name: "trips".to_string(),
                    value_type: ValueType::Int64,
                },
                FeatureSpec {
                    name: "rating".to_string(),
                    value_type: ValueType::Double,
                },
            ],
            max_age_seconds: 0,
        }
    }

    fn field(name: &str, value: Value) -> Field {
        Field {
            name: name.to_string(),
            value: Some(value.into()),
        }
    }

    fn key(spec: &FeatureSetSpec) -> RedisKey {
        let row = EntityRow::new(0).with_field("driver_id", 42i64);
        build_keys(&[row], spec).unwrap().remove(0)
    }

    fn expanded_row(spec: &FeatureSetSpec) -> FeatureRow {
        FeatureRow {
            fields: vec![
                field("driver_id", Value::Int64Val(42)),
                field("trips", Value::Int64Val(10)),
                field("rating", Value::DoubleVal(4.5)),
            ],
            event_timestamp: Some(Timestamp {
                seconds: 100,
                nanos: 0,
            }),
            feature_set: feature_set_ref(spec),
            ingestion_id: "ingestion-1".to_string(),
        }
    }

    fn sorted_fields(row: &FeatureRow) -> Vec<Field> {
        let mut fields = row.fields.clone();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        fields
    }

    #[test]
    fn test_compact_round_trip_restores_field_set() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);
        let original = expanded_row(&spec);

        let compact = decoder.encode(&original);
        assert!(decoder.is_encoded(&compact));
        assert!(decoder.is_encoding_valid(&compact));
        // values are ordered by feature name
        assert_eq!(compact.fields[0].value, Some(Value::DoubleVal(4.5).into()));
        assert_eq!(compact.fields[1].value, Some(Value::Int64Val(10).into()));

        let bytes = compact.encode_to_vec();
        let decoded = decoder
            .decode_bytes(Some(bytes), &key(&spec))
            .unwrap()
            .unwrap();

        assert_eq!(sorted_fields(&decoded), sorted_fields(&original));
        assert_eq!(decoded.event_timestamp, original.event_timestamp);
        assert_eq!(decoded.feature_set, "project/drivers");
        assert_eq!(decoded.ingestion_id, "ingestion-1");
    }

    #[test]
    fn test_expanded_row_passes_through_unchanged() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);
        let original = expanded_row(&spec);

        assert!(!decoder.is_encoded(&original));

        let decoded = decoder
            .decode_bytes(Some(original.encode_to_vec()), &key(&spec))
            .unwrap()
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_miss_is_not_an_error() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);

        assert_eq!(decoder.decode_bytes(None, &key(&spec)).unwrap(), None);
    }

    #[test]
    fn test_wrong_field_count_is_corrupt() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);
        let compact = FeatureRow {
            fields: vec![Field {
                name: String::new(),
                value: Some(Value::DoubleVal(4.5).into()),
            }],
            event_timestamp: None,
            feature_set: String::new(),
            ingestion_id: String::new(),
        };

        match decoder.decode_bytes(Some(compact.encode_to_vec()), &key(&spec)) {
            Err(ServingError::CorruptRow { feature_set, .. }) => {
                assert_eq!(feature_set, "project/drivers")
            }
            other => panic!("Expected CorruptRow, got {other:?}"),
        }
    }

    #[test]
    fn test_value_of_wrong_type_is_corrupt() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);
        let compact = FeatureRow {
            fields: vec![
                Field {
                    name: String::new(),
                    value: Some(Value::StringVal("not a double".to_string()).into()),
                },
                Field {
                    name: String::new(),
                    value: Some(Value::Int64Val(10).into()),
                },
            ],
            event_timestamp: None,
            feature_set: String::new(),
            ingestion_id: String::new(),
        };

        assert!(!decoder.is_encoding_valid(&compact));
        assert!(matches!(
            decoder.decode_bytes(Some(compact.encode_to_vec()), &key(&spec)),
            Err(ServingError::CorruptRow { .. })
        ));
    }

    #[test]
    fn test_unset_values_are_valid_in_compact_rows() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);
        let compact = FeatureRow {
            fields: vec![
                Field {
                    name: String::new(),
                    value: None,
                },
                Field {
                    name: String::new(),
                    value: Some(ProtoValue { val: None }),
                },
            ],
            event_timestamp: None,
            feature_set: String::new(),
            ingestion_id: String::new(),
        };

        assert!(decoder.is_encoding_valid(&compact));
        let decoded = decoder.decode(compact, &key(&spec));
        let names: Vec<&str> = decoded.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["driver_id", "rating", "trips"]);
    }

    #[test]
    fn test_garbage_bytes_are_corrupt() {
        let spec = spec();
        let decoder = FeatureRowDecoder::new(feature_set_ref(&spec), &spec);

        assert!(matches!(
            decoder.decode_bytes(Some(vec![0xff, 0xff, 0xff]), &key(&spec)),
            Err(ServingError::CorruptRow { .. })
        ));
    }
}
