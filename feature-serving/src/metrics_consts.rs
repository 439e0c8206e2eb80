pub const ONLINE_FEATURES_REQUEST_COUNTER: &str = "online_features_requests_total";
pub const ONLINE_FEATURES_ERROR_COUNTER: &str = "online_features_errors_total";
pub const ONLINE_FEATURES_LATENCY: &str = "online_features_request_duration_ms";
pub const ENTITY_ROWS_PER_REQUEST: &str = "online_features_entity_rows";
pub const FEATURE_REFERENCES_PER_REQUEST: &str = "online_features_feature_references";
pub const FEATURE_SETS_PER_REQUEST: &str = "online_features_feature_sets";
// counted per feature value, not per row
pub const MISSING_FEATURE_COUNTER: &str = "online_features_missing_total";
pub const STALE_FEATURE_COUNTER: &str = "online_features_stale_total";
