//! Field type descriptors
//!
//! A `TypeDescriptor` describes the expected shape of one field. Primitive kinds are
//! decoded by the value codec; `Named` and `Polymorphic` references are resolved
//! against the registry when the value is decoded.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::TypeName;

/// Scalar kinds understood by the value codec
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrimitiveKind {
    /// Signed integer
    #[strum(to_string = "int", serialize = "integer", serialize = "long")]
    Int,
    /// Floating point number
    #[strum(to_string = "float", serialize = "double")]
    Float,
    /// Boolean
    #[strum(to_string = "bool", serialize = "boolean")]
    Bool,
    /// UTF-8 string
    #[strum(to_string = "string", serialize = "str")]
    String,
    /// Binary data, base64 on the wire
    Bytes,
    /// Calendar date, ISO-8601 on the wire
    Date,
    /// Date and time with offset, ISO-8601 on the wire
    #[strum(to_string = "datetime", serialize = "dateTime")]
    DateTime,
    /// Arbitrary JSON passed through untouched
    #[strum(to_string = "object", serialize = "opaque")]
    Opaque,
}

/// Expected shape of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// A scalar decoded by the value codec
    Primitive(PrimitiveKind),
    /// Ordered sequence of elements of one type
    List(Box<Self>),
    /// String-keyed mapping to values of one type
    Map(Box<Self>),
    /// Reference to a registered schema or enum
    Named(TypeName),
    /// Reference resolved through the payload discriminator
    Polymorphic(TypeName),
}

impl TypeDescriptor {
    /// Primitive descriptor
    pub const fn primitive(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }

    /// List descriptor around an element descriptor
    pub fn list(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    /// Map descriptor around a value descriptor
    pub fn map(value: Self) -> Self {
        Self::Map(Box::new(value))
    }

    /// Named reference
    pub fn named(type_name: impl Into<TypeName>) -> Self {
        Self::Named(type_name.into())
    }

    /// Polymorphic reference
    pub fn polymorphic(type_name: impl Into<TypeName>) -> Self {
        Self::Polymorphic(type_name.into())
    }

    /// Replace the innermost non-collection descriptor, keeping list and map wrappers
    #[must_use]
    pub fn with_leaf(self, leaf: Self) -> Self {
        match self {
            Self::List(inner) => Self::list(inner.with_leaf(leaf)),
            Self::Map(inner) => Self::map(inner.with_leaf(leaf)),
            _ => leaf,
        }
    }

    /// Turn the innermost named reference into a polymorphic one
    #[must_use]
    pub fn into_polymorphic(self) -> Self {
        match self {
            Self::List(inner) => Self::list(inner.into_polymorphic()),
            Self::Map(inner) => Self::map(inner.into_polymorphic()),
            Self::Named(name) => Self::Polymorphic(name),
            other => other,
        }
    }

    /// Every registry reference reachable from this descriptor
    pub fn referenced_types(&self) -> Vec<&TypeName> {
        match self {
            Self::Primitive(_) => Vec::new(),
            Self::List(inner) | Self::Map(inner) => inner.referenced_types(),
            Self::Named(name) | Self::Polymorphic(name) => vec![name],
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Map(inner) => write!(f, "map(string, {inner})"),
            Self::Named(name) => write!(f, "{name}"),
            Self::Polymorphic(name) => write!(f, "{name}*"),
        }
    }
}
