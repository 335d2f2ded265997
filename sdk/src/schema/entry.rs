//! Registry entries: structural schemas and enum mappings

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{PrimitiveKind, TypeDescriptor, TypeName};
use crate::error::{Error, Result};

/// How one field of a record travels on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// JSON key for this field
    pub wire_key:   String,
    /// Expected shape
    pub field_type: TypeDescriptor,
    /// Typed models reject records where this field is unset
    pub required:   bool,
    /// An explicit `null` is meaningful and is kept rather than dropped
    pub nullable:   bool,
}

impl FieldSpec {
    /// Optional, non-nullable field
    pub fn new(wire_key: impl Into<String>, field_type: TypeDescriptor) -> Self {
        Self {
            wire_key: wire_key.into(),
            field_type,
            required: false,
            nullable: false,
        }
    }

    /// Mark the field as required
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as null-significant
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Structural schema of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Registry key
    pub type_name:     TypeName,
    /// Parent types, fields are inherited parent-first
    pub parents:       Vec<TypeName>,
    /// Field identifier to wire description, in declaration order
    pub fields:        IndexMap<String, FieldSpec>,
    /// Abstract base whose concrete type is chosen by the payload discriminator
    pub polymorphic:   bool,
    /// Discriminator value naming this type, defaults to the type name
    pub discriminator: Option<String>,
    /// Content type used when this record is a dialect A request body
    pub media_type:    Option<String>,
}

impl SchemaEntry {
    /// Start building a schema for `type_name`
    pub fn builder(type_name: impl Into<TypeName>) -> SchemaEntryBuilder {
        SchemaEntryBuilder {
            entry: Self {
                type_name:     type_name.into(),
                parents:       Vec::new(),
                fields:        IndexMap::new(),
                polymorphic:   false,
                discriminator: None,
                media_type:    None,
            },
        }
    }

    /// The value of `_type` that selects this schema
    pub fn discriminator_value(&self) -> &str {
        self.discriminator
            .as_deref()
            .unwrap_or_else(|| self.type_name.as_str())
    }

    /// Check that wire keys are unique within this entry
    pub fn check_wire_keys(&self) -> Result<()> {
        let mut seen: IndexMap<&str, &str> = IndexMap::new();
        for (field, spec) in &self.fields {
            if let Some(previous) = seen.insert(spec.wire_key.as_str(), field.as_str()) {
                return Err(Error::Configuration(format!(
                    "Schema `{}` maps fields `{previous}` and `{field}` to the same wire key `{}`",
                    self.type_name, spec.wire_key
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Builder for `SchemaEntry`
#[derive(Debug, Clone)]
pub struct SchemaEntryBuilder {
    entry: SchemaEntry,
}

impl SchemaEntryBuilder {
    /// Inherit the fields of `parent`
    #[must_use]
    pub fn parent(mut self, parent: impl Into<TypeName>) -> Self {
        self.entry.parents.push(parent.into());
        self
    }

    /// Declare a field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.entry.fields.insert(name.into(), spec);
        self
    }

    /// Declare a field whose wire key equals its identifier
    #[must_use]
    pub fn simple_field(self, name: &str, field_type: TypeDescriptor) -> Self {
        self.field(name, FieldSpec::new(name, field_type))
    }

    /// Declare a primitive field whose wire key equals its identifier
    #[must_use]
    pub fn primitive_field(self, name: &str, kind: PrimitiveKind) -> Self {
        self.simple_field(name, TypeDescriptor::Primitive(kind))
    }

    /// Mark the schema as a polymorphic base
    #[must_use]
    pub const fn polymorphic(mut self) -> Self {
        self.entry.polymorphic = true;
        self
    }

    /// Override the discriminator value
    #[must_use]
    pub fn discriminator(mut self, value: impl Into<String>) -> Self {
        self.entry.discriminator = Some(value.into());
        self
    }

    /// Default request content type
    #[must_use]
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.entry.media_type = Some(media_type.into());
        self
    }

    /// Finish the schema
    pub fn build(self) -> SchemaEntry {
        self.entry
    }
}

/// Wire string to symbolic constant mapping of one enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumEntry {
    /// Registry key
    pub type_name: TypeName,
    /// Wire value to constant name, in declaration order
    pub values:    IndexMap<String, String>,
}

impl EnumEntry {
    /// Create an empty enumeration
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            values:    IndexMap::new(),
        }
    }

    /// Add a wire value and its constant
    #[must_use]
    pub fn value(mut self, wire: impl Into<String>, constant: impl Into<String>) -> Self {
        self.values.insert(wire.into(), constant.into());
        self
    }

    /// Constant for a wire value
    pub fn constant_for(&self, wire: &str) -> Option<&str> {
        self.values.get(wire).map(String::as_str)
    }

    /// Wire value for a constant
    pub fn wire_for(&self, constant: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, c)| c.as_str() == constant)
            .map(|(wire, _)| wire.as_str())
    }
}
