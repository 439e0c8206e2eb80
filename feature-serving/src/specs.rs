use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::instrument;

use crate::errors::ServingError;
use crate::refs::{feature_ref, feature_set_ref};
use crate::types::{FeatureReference, FeatureSetRequest, FeatureSetSpec};

/// Resolves requested feature references to the feature sets that store them.
///
/// The retrieval path treats the returned grouping as authoritative: one entry
/// per distinct feature set, carrying the references it serves.
#[async_trait]
pub trait SpecService {
    async fn get_feature_sets(
        &self,
        references: &[FeatureReference],
    ) -> Result<Vec<FeatureSetRequest>, ServingError>;
}

type Predicate<'r> = Box<dyn Fn(&FeatureSetSpec) -> bool + 'r>;

/// A fixed registry of feature set specs, loaded once at startup. Only the
/// latest version of each `(project, name)` is kept.
pub struct StaticSpecService {
    specs: Vec<FeatureSetSpec>,
    default_project: String,
}

impl StaticSpecService {
    pub fn new(specs: Vec<FeatureSetSpec>, default_project: impl Into<String>) -> Self {
        // rows are keyed without a version, so older versions can never be decoded
        let mut latest: Vec<FeatureSetSpec> = Vec::with_capacity(specs.len());
        for spec in specs {
            match latest
                .iter_mut()
                .find(|s| s.project == spec.project && s.name == spec.name)
            {
                Some(existing) if existing.version < spec.version => *existing = spec,
                Some(_) => {}
                None => latest.push(spec),
            }
        }

        Self {
            specs: latest,
            default_project: default_project.into(),
        }
    }

    /// Load specs from a JSON file holding an array of feature set specs.
    pub fn from_json_file(
        path: &Path,
        default_project: impl Into<String>,
    ) -> Result<Self, ServingError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ServingError::InvalidConfiguration(format!(
                "unable to read feature sets from {}: {e}",
                path.display()
            ))
        })?;
        let specs: Vec<FeatureSetSpec> = serde_json::from_str(&contents).map_err(|e| {
            ServingError::InvalidConfiguration(format!(
                "unable to parse feature sets in {}: {e}",
                path.display()
            ))
        })?;

        tracing::info!(feature_sets = specs.len(), "loaded feature set specs");
        Ok(Self::new(specs, default_project))
    }

    /// Every filter the reference implies. A filter for an unset part of the
    /// reference accepts everything.
    fn predicates<'r>(&'r self, reference: &'r FeatureReference) -> Vec<Predicate<'r>> {
        let project = if reference.project.is_empty() {
            self.default_project.as_str()
        } else {
            reference.project.as_str()
        };

        let mut predicates: Vec<Predicate<'r>> = Vec::with_capacity(3);
        predicates.push(Box::new(move |spec: &FeatureSetSpec| spec.project == project));
        predicates.push(Box::new(move |spec: &FeatureSetSpec| {
            reference.feature_set.is_empty() || spec.name == reference.feature_set
        }));
        predicates.push(Box::new(move |spec: &FeatureSetSpec| {
            spec.features.iter().any(|f| f.name == reference.name)
        }));
        predicates
    }

    fn resolve(&self, reference: &FeatureReference) -> Result<&FeatureSetSpec, ServingError> {
        let matches: Vec<&FeatureSetSpec> = self.predicates(reference).iter().fold(
            self.specs.iter().collect(),
            |candidates, predicate| {
                candidates
                    .into_iter()
                    .filter(|&spec| predicate(spec))
                    .collect()
            },
        );

        match matches.as_slice() {
            [] => Err(ServingError::FeatureSetNotFound(feature_ref(reference))),
            [spec] => Ok(*spec),
            _ => Err(ServingError::AmbiguousFeatureReference {
                reference: feature_ref(reference),
                candidates: matches.iter().map(|s| feature_set_ref(s)).collect(),
            }),
        }
    }
}

#[async_trait]
impl SpecService for StaticSpecService {
    #[instrument(skip_all, fields(references = references.len()))]
    async fn get_feature_sets(
        &self,
        references: &[FeatureReference],
    ) -> Result<Vec<FeatureSetRequest>, ServingError> {
        let mut requests: Vec<FeatureSetRequest> = Vec::new();
        let mut index_by_set: HashMap<String, usize> = HashMap::new();

        for reference in references {
            let spec = self.resolve(reference)?;
            let set_ref = feature_set_ref(spec);

            match index_by_set.get(&set_ref) {
                Some(&index) => {
                    let refs = &mut requests[index].feature_references;
                    if !refs.contains(reference) {
                        refs.push(reference.clone());
                    }
                }
                None => {
                    index_by_set.insert(set_ref, requests.len());
                    requests.push(FeatureSetRequest {
                        spec: spec.clone(),
                        feature_references: vec![reference.clone()],
                    });
                }
            }
        }

        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureSpec, ValueType};

    fn spec(project: &str, name: &str, version: u32, features: &[&str]) -> FeatureSetSpec {
        FeatureSetSpec {
            project: project.to_string(),
            name: name.to_string(),
            version,
            entities: vec!["driver_id".to_string()],
            features: features
                .iter()
                .map(|f| FeatureSpec {
                    name: f.to_string(),
                    value_type: ValueType::Int64,
                })
                .collect(),
            max_age_seconds: 0,
        }
    }

    fn registry() -> StaticSpecService {
        StaticSpecService::new(
            vec![
                spec("default", "drivers", 1, &["trips", "rating"]),
                spec("default", "customers", 1, &["orders"]),
                spec("ride", "drivers", 1, &["trips"]),
                spec("ride", "drivers", 2, &["trips", "acceptance"]),
                spec("ride", "vehicles", 1, &["trips"]),
            ],
            "default",
        )
    }

    #[tokio::test]
    async fn test_references_are_grouped_by_feature_set_in_first_seen_order() {
        let references = vec![
            FeatureReference::new("orders"),
            FeatureReference::new("trips"),
            FeatureReference::new("rating"),
            FeatureReference::new("orders"),
        ];

        let requests = registry().get_feature_sets(&references).await.unwrap();

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].spec.name, "customers");
        assert_eq!(
            requests[0].feature_references,
            vec![FeatureReference::new("orders")]
        );
        assert_eq!(requests[1].spec.name, "drivers");
        assert_eq!(
            requests[1].feature_references,
            vec![FeatureReference::new("trips"), FeatureReference::new("rating")]
        );
    }

    #[tokio::test]
    async fn test_latest_version_is_served() {
        let references = vec![FeatureReference::new("acceptance")
            .with_project("ride")
            .with_feature_set("drivers")];

        let requests = registry().get_feature_sets(&references).await.unwrap();

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].spec.version, 2);
    }

    #[tokio::test]
    async fn test_feature_dropped_by_latest_version_is_not_found() {
        let service = StaticSpecService::new(
            vec![
                spec("ride", "drivers", 1, &["trips", "rating"]),
                spec("ride", "drivers", 2, &["trips"]),
            ],
            "default",
        );

        let references = vec![FeatureReference::new("rating").with_project("ride")];
        match service.get_feature_sets(&references).await {
            Err(ServingError::FeatureSetNotFound(reference)) => {
                assert_eq!(reference, "ride/rating")
            }
            other => panic!("Expected FeatureSetNotFound, got {other:?}"),
        }

        let references = vec![FeatureReference::new("trips").with_project("ride")];
        let requests = service.get_feature_sets(&references).await.unwrap();
        assert_eq!(requests[0].spec.version, 2);
    }

    #[tokio::test]
    async fn test_superseded_version_listed_last_is_ignored() {
        let service = StaticSpecService::new(
            vec![
                spec("ride", "drivers", 3, &["trips"]),
                spec("ride", "drivers", 1, &["trips", "rating"]),
            ],
            "default",
        );

        let references = vec![FeatureReference::new("rating").with_project("ride")];
        assert!(matches!(
            service.get_feature_sets(&references).await,
            Err(ServingError::FeatureSetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ambiguous_reference_is_rejected() {
        let references = vec![FeatureReference::new("trips").with_project("ride")];

        match registry().get_feature_sets(&references).await {
            Err(ServingError::AmbiguousFeatureReference {
                reference,
                mut candidates,
            }) => {
                candidates.sort();
                assert_eq!(reference, "ride/trips");
                assert_eq!(candidates, vec!["ride/drivers", "ride/vehicles"]);
            }
            other => panic!("Expected AmbiguousFeatureReference, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_feature_set_qualifier_disambiguates() {
        let references = vec![FeatureReference::new("trips")
            .with_project("ride")
            .with_feature_set("vehicles")];

        let requests = registry().get_feature_sets(&references).await.unwrap();

        assert_eq!(requests[0].spec.name, "vehicles");
    }

    #[tokio::test]
    async fn test_unknown_feature_is_not_found() {
        let references = vec![FeatureReference::new("does_not_exist")];

        match registry().get_feature_sets(&references).await {
            Err(err @ ServingError::FeatureSetNotFound(_)) => assert!(err.is_client_error()),
            other => panic!("Expected FeatureSetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!(
            "feature_sets_{}.json",
            crate::test_utils::random_string("", 8)
        ));
        std::fs::write(
            &path,
            r#"[{"project": "ride", "name": "drivers", "entities": ["driver_id"],
                 "features": [{"name": "trips", "value_type": "INT64"}],
                 "max_age_seconds": 30}]"#,
        )
        .unwrap();

        let service = StaticSpecService::from_json_file(&path, "default").unwrap();
        std::fs::remove_file(&path).unwrap();

        let spec = service
            .resolve(&FeatureReference::new("trips").with_project("ride"))
            .unwrap();
        assert_eq!(spec.max_age_seconds, 30);
        assert_eq!(spec.version, 0);
    }

    #[test]
    fn test_missing_file_is_invalid_configuration() {
        let result = StaticSpecService::from_json_file(
            Path::new("/definitely/not/here/feature_sets.json"),
            "default",
        );
        assert!(matches!(
            result,
            Err(ServingError::InvalidConfiguration(_))
        ));
    }
}
