//! A newtype wrapper for model type names used throughout the registry
//!
//! Type names are the keys of the schema registry (e.g. `"AdminOrg"`, `"Task"`).
//! Some generated names carry a namespace prefix (`"vcloud::AdminOrg"`), which
//! `short_name` strips for display.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A newtype wrapper for registry type names used as `HashMap` keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Get the underlying string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the short name (last segment after ::)
    /// For example: `vcloud::AdminOrg` returns `AdminOrg`
    pub fn short_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for TypeName {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl From<&Self> for TypeName {
    fn from(s: &Self) -> Self {
        s.clone()
    }
}

impl From<TypeName> for String {
    fn from(type_name: TypeName) -> Self {
        type_name.0
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TypeName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TypeName> for Value {
    fn from(type_name: TypeName) -> Self {
        Self::String(type_name.0)
    }
}
