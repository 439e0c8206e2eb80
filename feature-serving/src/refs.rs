use std::fmt;

use crate::types::{FeatureReference, FeatureSetSpec};

/// Canonical string form of a feature reference: `[project/][feature_set:]name`.
///
/// This is also the output field name of the feature in a response record.
pub fn feature_ref(reference: &FeatureReference) -> String {
    let mut ref_str = reference.name.clone();
    if !reference.feature_set.is_empty() {
        ref_str = format!("{}:{}", reference.feature_set, ref_str);
    }
    if !reference.project.is_empty() {
        ref_str = format!("{}/{}", reference.project, ref_str);
    }
    ref_str
}

/// Storage-side reference of a feature set: `project/name`, without version.
pub fn feature_set_ref(spec: &FeatureSetSpec) -> String {
    format!("{}/{}", spec.project, spec.name)
}

impl fmt::Display for FeatureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&feature_ref(self))
    }
}
