use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::proto::{self, value::Val};

/// A reference to a single feature, optionally qualified by project and feature set.
///
/// Empty strings mean "not set", matching the request wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FeatureReference {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub feature_set: String,
    pub name: String,
}

impl FeatureReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_feature_set(mut self, feature_set: impl Into<String>) -> Self {
        self.feature_set = feature_set.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Bytes,
    String,
    Int32,
    Int64,
    Double,
    Float,
    Bool,
}

impl ValueType {
    pub fn matches(&self, val: &Val) -> bool {
        matches!(
            (self, val),
            (ValueType::Bytes, Val::BytesVal(_))
                | (ValueType::String, Val::StringVal(_))
                | (ValueType::Int32, Val::Int32Val(_))
                | (ValueType::Int64, Val::Int64Val(_))
                | (ValueType::Double, Val::DoubleVal(_))
                | (ValueType::Float, Val::FloatVal(_))
                | (ValueType::Bool, Val::BoolVal(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeatureSpec {
    pub name: String,
    pub value_type: ValueType,
}

/// A named, versioned group of features sharing entity keys and a max age.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeatureSetSpec {
    #[serde(default)]
    pub project: String,
    pub name: String,
    #[serde(default)]
    pub version: u32,
    pub entities: Vec<String>,
    #[serde(default)]
    pub features: Vec<FeatureSpec>,
    /// Zero disables the staleness check.
    #[serde(default)]
    pub max_age_seconds: u64,
}

/// The feature set a group of requested references resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSetRequest {
    pub spec: FeatureSetSpec,
    pub feature_references: Vec<FeatureReference>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    BytesVal(Vec<u8>),
    StringVal(String),
    Int32Val(i32),
    Int64Val(i64),
    DoubleVal(f64),
    FloatVal(f32),
    BoolVal(bool),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32Val(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64Val(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::DoubleVal(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::BoolVal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::StringVal(v.to_string())
    }
}

impl From<Value> for proto::Value {
    fn from(value: Value) -> Self {
        let val = match value {
            Value::BytesVal(v) => Val::BytesVal(v),
            Value::StringVal(v) => Val::StringVal(v),
            Value::Int32Val(v) => Val::Int32Val(v),
            Value::Int64Val(v) => Val::Int64Val(v),
            Value::DoubleVal(v) => Val::DoubleVal(v),
            Value::FloatVal(v) => Val::FloatVal(v),
            Value::BoolVal(v) => Val::BoolVal(v),
        };
        proto::Value { val: Some(val) }
    }
}

impl From<Val> for Value {
    fn from(val: Val) -> Self {
        match val {
            Val::BytesVal(v) => Value::BytesVal(v),
            Val::StringVal(v) => Value::StringVal(v),
            Val::Int32Val(v) => Value::Int32Val(v),
            Val::Int64Val(v) => Value::Int64Val(v),
            Val::DoubleVal(v) => Value::DoubleVal(v),
            Val::FloatVal(v) => Value::FloatVal(v),
            Val::BoolVal(v) => Value::BoolVal(v),
        }
    }
}

/// One lookup unit: a reference timestamp plus named entity values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EntityRow {
    /// Unix seconds. Zero means "now".
    #[serde(default)]
    pub entity_timestamp: i64,
    pub fields: HashMap<String, Value>,
}

impl EntityRow {
    pub fn new(entity_timestamp: i64) -> Self {
        Self {
            entity_timestamp,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GetOnlineFeaturesRequest {
    pub features: Vec<FeatureReference>,
    pub entity_rows: Vec<EntityRow>,
    #[serde(default)]
    pub omit_entities_in_response: bool,
    #[serde(default)]
    pub include_metadata_in_response: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Present,
    /// The stored row has the field but it carries no value.
    NullValue,
    NotFound,
    OutsideMaxAge,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FieldStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub fields: HashMap<String, Field>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GetOnlineFeaturesResponse {
    pub records: Vec<Record>,
}
