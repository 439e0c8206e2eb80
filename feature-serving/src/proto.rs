//! Protobuf messages stored in, and used to address, the online store.
//!
//! These mirror the messages the ingestion path writes, so field tags must not
//! change. They are declared by hand with the prost derives instead of being
//! generated at build time, which keeps protoc out of the build.

/// A typed feature or entity value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value::Val", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub val: Option<value::Val>,
}

pub mod value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Val {
        #[prost(bytes, tag = "1")]
        BytesVal(Vec<u8>),
        #[prost(string, tag = "2")]
        StringVal(String),
        #[prost(int32, tag = "3")]
        Int32Val(i32),
        #[prost(int64, tag = "4")]
        Int64Val(i64),
        #[prost(double, tag = "5")]
        DoubleVal(f64),
        #[prost(float, tag = "6")]
        FloatVal(f32),
        #[prost(bool, tag = "7")]
        BoolVal(bool),
    }
}

/// A named value. In a compact feature row the name is left empty.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Field {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<Value>,
}

/// The value stored for one entity of one feature set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FeatureRow {
    #[prost(message, repeated, tag = "2")]
    pub fields: Vec<Field>,
    #[prost(message, optional, tag = "3")]
    pub event_timestamp: Option<::prost_types::Timestamp>,
    #[prost(string, tag = "6")]
    pub feature_set: String,
    #[prost(string, tag = "7")]
    pub ingestion_id: String,
}

impl FeatureRow {
    /// Event time in unix seconds; an unset timestamp reads as the epoch.
    pub fn event_seconds(&self) -> i64 {
        self.event_timestamp.as_ref().map_or(0, |ts| ts.seconds)
    }
}

/// The lookup key of a feature row: the feature set reference plus the entity
/// values, sorted by entity name.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RedisKey {
    #[prost(string, tag = "2")]
    pub feature_set: String,
    #[prost(message, repeated, tag = "3")]
    pub entities: Vec<Field>,
}
