use std::collections::HashMap;

use crate::proto::FeatureRow;
use crate::refs::feature_ref;
use crate::types::{
    EntityRow, Field, FieldStatus, FeatureSetRequest, GetOnlineFeaturesRequest,
    GetOnlineFeaturesResponse, Record, Value,
};

/// The response plus the per-request tallies that feed metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledResponse {
    pub response: GetOnlineFeaturesResponse,
    pub missing_fields: u64,
    pub stale_fields: u64,
}

/// Join the requested entity rows against the rows fetched for every feature set.
///
/// Each group's rows must be index-aligned with `request.entity_rows`. Only the
/// group's requested references are walked, so stored fields nobody asked for
/// never reach the response. `now` (unix seconds) stands in for entity rows
/// without a timestamp.
pub fn assemble(
    request: &GetOnlineFeaturesRequest,
    groups: &[(FeatureSetRequest, Vec<Option<FeatureRow>>)],
    now: i64,
) -> AssembledResponse {
    let with_status = request.include_metadata_in_response;
    let mut assembled = AssembledResponse::default();

    for (row_index, entity_row) in request.entity_rows.iter().enumerate() {
        let mut fields: HashMap<String, Field> = HashMap::new();

        if !request.omit_entities_in_response {
            for (name, value) in &entity_row.fields {
                fields.insert(
                    name.clone(),
                    field(Some(value.clone()), FieldStatus::Present, with_status),
                );
            }
        }

        for (group, rows) in groups {
            let stored = rows.get(row_index).and_then(Option::as_ref);
            let max_age = group.spec.max_age_seconds;
            let stale = stored.is_some_and(|row| is_stale(entity_row, row, max_age, now));

            for reference in &group.feature_references {
                let stored_value = stored.and_then(|row| {
                    row.fields
                        .iter()
                        .find(|f| f.name == reference.name)
                        .map(|f| f.value.as_ref().and_then(|v| v.val.clone()))
                });

                let (value, status) = match stored_value {
                    None => {
                        assembled.missing_fields += 1;
                        (None, FieldStatus::NotFound)
                    }
                    Some(_) if stale => {
                        assembled.stale_fields += 1;
                        (None, FieldStatus::OutsideMaxAge)
                    }
                    Some(None) => (None, FieldStatus::NullValue),
                    Some(Some(val)) => (Some(Value::from(val)), FieldStatus::Present),
                };

                fields.insert(feature_ref(reference), field(value, status, with_status));
            }
        }

        assembled.response.records.push(Record { fields });
    }

    assembled
}

fn field(value: Option<Value>, status: FieldStatus, with_status: bool) -> Field {
    Field {
        value,
        status: with_status.then_some(status),
    }
}

fn is_stale(entity_row: &EntityRow, row: &FeatureRow, max_age_seconds: u64, now: i64) -> bool {
    if max_age_seconds == 0 {
        return false;
    }
    let entity_ts = if entity_row.entity_timestamp == 0 {
        now
    } else {
        entity_row.entity_timestamp
    };
    let age = i128::from(entity_ts) - i128::from(row.event_seconds());
    age > i128::from(max_age_seconds)
}
