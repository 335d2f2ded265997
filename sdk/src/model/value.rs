//! In-memory model values
//!
//! `ModelValue` is the tree the serializer walks and the deserializer builds. Every
//! subtree is owned by its parent, so a value can never alias or cycle back on itself.

use chrono::{DateTime, FixedOffset, NaiveDate};
use indexmap::IndexMap;
use serde_json::Value;

use super::Record;
use crate::schema::TypeName;

/// One materialized value of a model tree
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValue {
    /// Explicit null, only kept where a schema marks it significant
    Null,
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time with offset
    DateTime(DateTime<FixedOffset>),
    /// JSON passed through untouched
    Opaque(Value),
    /// Enumeration constant
    Enum(EnumValue),
    /// Ordered sequence
    List(Vec<Self>),
    /// String-keyed mapping
    Map(IndexMap<String, Self>),
    /// Typed record
    Record(Record),
}

impl ModelValue {
    /// Structural value for raw JSON, with numbers split into integers and floats
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Short name of the variant, used in error messages
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Opaque(_) => "opaque",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    /// Whether this is an explicit null
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer contents
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float contents, widening integers
    #[allow(clippy::cast_precision_loss, reason = "wire integers are well within f64 range")]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean contents
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Record contents
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// List contents
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map contents
    pub const fn as_map(&self) -> Option<&IndexMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Enum contents
    pub const fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Self::Enum(value) => Some(value),
            _ => None,
        }
    }

    /// Take the record out of this value
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<&str> for ModelValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ModelValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ModelValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for ModelValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for ModelValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ModelValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for ModelValue {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<DateTime<FixedOffset>> for ModelValue {
    fn from(datetime: DateTime<FixedOffset>) -> Self {
        Self::DateTime(datetime)
    }
}

impl From<Record> for ModelValue {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<EnumValue> for ModelValue {
    fn from(value: EnumValue) -> Self {
        Self::Enum(value)
    }
}

impl From<Vec<Self>> for ModelValue {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl From<IndexMap<String, Self>> for ModelValue {
    fn from(map: IndexMap<String, Self>) -> Self {
        Self::Map(map)
    }
}

/// Symbolic constant of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumConstant {
    /// A constant the registry maps
    Known(String),
    /// A wire value newer than this client, kept verbatim
    Unknown(String),
}

impl EnumConstant {
    /// Constant name, or the raw wire value when unknown
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(s) | Self::Unknown(s) => s,
        }
    }

    /// Whether the registry had no mapping for the wire value
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

/// An enum value tagged with its enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// Registered enumeration
    pub type_name: TypeName,
    /// Selected constant
    pub constant:  EnumConstant,
}

impl EnumValue {
    /// A mapped constant
    pub fn known(type_name: impl Into<TypeName>, constant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant:  EnumConstant::Known(constant.into()),
        }
    }

    /// An unmapped wire value
    pub fn unknown(type_name: impl Into<TypeName>, raw: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            constant:  EnumConstant::Unknown(raw.into()),
        }
    }
}
