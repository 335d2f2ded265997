//! Records: a type name plus its populated fields
//!
//! A field that was never set is simply absent from `fields`; a field set to
//! `ModelValue::Null` is present with an explicit null. The serializer and
//! deserializer keep those two states distinct.

use indexmap::IndexMap;

use super::ModelValue;
use crate::schema::TypeName;

/// An instance of a registered schema
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: TypeName,
    fields:    IndexMap<String, ModelValue>,
}

impl Record {
    /// An empty record of `type_name`
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            fields:    IndexMap::new(),
        }
    }

    /// Start building a record of `type_name`
    pub fn builder(type_name: impl Into<TypeName>) -> RecordBuilder {
        RecordBuilder {
            record: Self::new(type_name),
        }
    }

    /// Assemble a record from already-collected fields
    pub fn from_parts(type_name: impl Into<TypeName>, fields: IndexMap<String, ModelValue>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// The schema this record is an instance of
    pub const fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Populated fields by identifier, in insertion order
    pub const fn fields(&self) -> &IndexMap<String, ModelValue> {
        &self.fields
    }

    /// Consume the record, keeping its fields
    pub fn into_fields(self) -> IndexMap<String, ModelValue> {
        self.fields
    }

    /// Value of a field, `None` when unset
    pub fn get(&self, field: &str) -> Option<&ModelValue> {
        self.fields.get(field)
    }

    /// Whether a field is set (an explicit null counts as set)
    pub fn is_set(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Set a field
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<ModelValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Unset a field, returning its previous value
    pub fn unset(&mut self, field: &str) -> Option<ModelValue> {
        self.fields.shift_remove(field)
    }

    /// String field
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(ModelValue::as_str)
    }

    /// Boolean field
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(ModelValue::as_bool)
    }

    /// Integer field
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(ModelValue::as_i64)
    }

    /// Nested record field
    pub fn get_record(&self, field: &str) -> Option<&Self> {
        self.get(field).and_then(ModelValue::as_record)
    }

    /// List field
    pub fn get_list(&self, field: &str) -> Option<&[ModelValue]> {
        self.get(field).and_then(ModelValue::as_list)
    }
}

/// Single construction path for records
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Set a field
    #[must_use]
    pub fn field(mut self, field: impl Into<String>, value: impl Into<ModelValue>) -> Self {
        self.record.set(field, value);
        self
    }

    /// Set a field when a value is present, leave it unset otherwise
    #[must_use]
    pub fn maybe_field<V: Into<ModelValue>>(
        self,
        field: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        match value {
            Some(value) => self.field(field, value),
            None => self,
        }
    }

    /// Finish the record
    pub fn build(self) -> Record {
        self.record
    }
}
