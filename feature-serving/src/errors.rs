use common_redis::{CustomRedisError, RetryMethod};
use thiserror::Error;

/// Broad classification of a failure, in the vocabulary of gRPC status codes so a
/// transport layer can map it without inspecting individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Unavailable,
    DeadlineExceeded,
    DataLoss,
    Internal,
}

#[derive(Error, Debug)]
pub enum ServingError {
    #[error("Entity row {row} fields {available:?} do not contain required entity field \"{entity}\"")]
    MissingEntityField {
        row: usize,
        entity: String,
        available: Vec<String>,
    },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("No feature set found for feature reference \"{0}\"")]
    FeatureSetNotFound(String),
    #[error("Feature reference \"{reference}\" is ambiguous, it matches feature sets {candidates:?}")]
    AmbiguousFeatureReference {
        reference: String,
        candidates: Vec<String>,
    },
    #[error("Unable to retrieve features from the online store: {0}")]
    StoreUnavailable(#[source] CustomRedisError),
    #[error("Timed out while retrieving features")]
    Timeout,
    #[error("Failed to decode feature row of feature set \"{feature_set}\", possible data corruption: {reason}")]
    CorruptRow { feature_set: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ServingError {
    fn error_metadata(&self) -> (&'static str, ErrorKind) {
        match self {
            ServingError::MissingEntityField { .. } => {
                ("missing_entity_field", ErrorKind::InvalidArgument)
            }
            ServingError::InvalidRequest(_) => ("invalid_request", ErrorKind::InvalidArgument),
            ServingError::FeatureSetNotFound(_) => ("feature_set_not_found", ErrorKind::NotFound),
            ServingError::AmbiguousFeatureReference { .. } => {
                ("ambiguous_feature_reference", ErrorKind::InvalidArgument)
            }
            ServingError::StoreUnavailable(_) => ("store_unavailable", ErrorKind::Unavailable),
            ServingError::Timeout => ("timeout", ErrorKind::DeadlineExceeded),
            ServingError::CorruptRow { .. } => ("corrupt_row", ErrorKind::DataLoss),
            ServingError::InvalidConfiguration(_) => {
                ("invalid_configuration", ErrorKind::Internal)
            }
        }
    }

    /// Returns a short error code for logs and metric labels.
    pub fn error_code(&self) -> &'static str {
        self.error_metadata().0
    }

    pub fn kind(&self) -> ErrorKind {
        self.error_metadata().1
    }

    /// True when the caller sent something it has to fix before retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidArgument | ErrorKind::NotFound)
    }

    /// Whether the same request may succeed if retried with backoff.
    ///
    /// Reads are idempotent, so only store outages and deadlines qualify; every
    /// other failure is deterministic for a given input.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServingError::StoreUnavailable(err) => {
                !matches!(err.retry_method(), RetryMethod::NoRetry)
            }
            ServingError::Timeout => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_redis::RedisErrorKind;
    use rstest::rstest;

    fn missing_entity() -> ServingError {
        ServingError::MissingEntityField {
            row: 1,
            entity: "driver_id".to_string(),
            available: vec!["customer_id".to_string()],
        }
    }

    fn corrupt_row() -> ServingError {
        ServingError::CorruptRow {
            feature_set: "project/driver".to_string(),
            reason: "expected 2 fields, found 3".to_string(),
        }
    }

    #[rstest]
    #[case::missing_entity(missing_entity(), "missing_entity_field", ErrorKind::InvalidArgument)]
    #[case::invalid_request(
        ServingError::InvalidRequest("no features".to_string()),
        "invalid_request",
        ErrorKind::InvalidArgument
    )]
    #[case::not_found(
        ServingError::FeatureSetNotFound("feature1".to_string()),
        "feature_set_not_found",
        ErrorKind::NotFound
    )]
    #[case::store_unavailable(
        ServingError::StoreUnavailable(CustomRedisError::Timeout),
        "store_unavailable",
        ErrorKind::Unavailable
    )]
    #[case::timeout(ServingError::Timeout, "timeout", ErrorKind::DeadlineExceeded)]
    #[case::corrupt(corrupt_row(), "corrupt_row", ErrorKind::DataLoss)]
    fn test_error_metadata(
        #[case] err: ServingError,
        #[case] code: &str,
        #[case] kind: ErrorKind,
    ) {
        assert_eq!(err.error_code(), code);
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_only_store_failures_and_timeouts_are_retryable() {
        assert!(ServingError::Timeout.is_retryable());
        assert!(ServingError::StoreUnavailable(CustomRedisError::Timeout).is_retryable());
        assert!(ServingError::StoreUnavailable(CustomRedisError::from_redis_kind(
            RedisErrorKind::IoError,
            "Connection refused"
        ))
        .is_retryable());

        assert!(!ServingError::StoreUnavailable(CustomRedisError::from_redis_kind(
            RedisErrorKind::AuthenticationFailed,
            "WRONGPASS"
        ))
        .is_retryable());
        assert!(!missing_entity().is_retryable());
        assert!(!corrupt_row().is_retryable());
    }

    #[test]
    fn test_client_errors() {
        assert!(missing_entity().is_client_error());
        assert!(ServingError::AmbiguousFeatureReference {
            reference: "feature1".to_string(),
            candidates: vec!["p/a".to_string(), "p/b".to_string()],
        }
        .is_client_error());
        assert!(!corrupt_row().is_client_error());
        assert!(!ServingError::Timeout.is_client_error());
    }

    #[test]
    fn test_missing_entity_message_names_the_entity() {
        let message = missing_entity().to_string();
        assert!(message.contains("\"driver_id\""));
        assert!(message.contains("customer_id"));
    }
}
