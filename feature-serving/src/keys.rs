use crate::errors::ServingError;
use crate::proto::{Field, RedisKey};
use crate::refs::feature_set_ref;
use crate::types::{EntityRow, FeatureSetSpec};

/// Build one lookup key per entity row, in row order.
///
/// Entity names are sorted before the key is built, so rows with the same
/// entity values always produce byte-identical keys regardless of the order the
/// feature set declares its entities or the row's map happens to iterate in.
pub fn build_keys(
    entity_rows: &[EntityRow],
    spec: &FeatureSetSpec,
) -> Result<Vec<RedisKey>, ServingError> {
    let feature_set = feature_set_ref(spec);

    let mut entity_names: Vec<&str> = spec.entities.iter().map(String::as_str).collect();
    entity_names.sort_unstable();
    entity_names.dedup();

    entity_rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| make_key(&feature_set, &entity_names, row_index, row))
        .collect()
}

fn make_key(
    feature_set: &str,
    entity_names: &[&str],
    row_index: usize,
    entity_row: &EntityRow,
) -> Result<RedisKey, ServingError> {
    let mut entities = Vec::with_capacity(entity_names.len());

    for &entity_name in entity_names {
        let value = entity_row.fields.get(entity_name).ok_or_else(|| {
            let mut available: Vec<String> = entity_row.fields.keys().cloned().collect();
            available.sort();
            ServingError::MissingEntityField {
                row: row_index,
                entity: entity_name.to_string(),
                available,
            }
        })?;

        entities.push(Field {
            name: entity_name.to_string(),
            value: Some(value.clone().into()),
        });
    }

    Ok(RedisKey {
        feature_set: feature_set.to_string(),
        entities,
    })
}
