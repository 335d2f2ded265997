//! Model tree to JSON
//!
//! Records are emitted under their wire keys in schema order. Unset fields never
//! appear; an explicit null is written only for fields marked nullable, since the
//! API treats "present with null" and "absent" differently on partial updates.
//! A subtype record in a field declared as its base carries `_type`.

use error_stack::{Report, ResultExt};
use serde_json::{Map, Value};

use super::scalar::{encode_enum, encode_scalar};
use crate::constants::DISCRIMINATOR_KEY;
use crate::error::{Error, Result};
use crate::model::{ModelValue, Record};
use crate::schema::{PrimitiveKind, RegistryEntry, SchemaRegistry, TypeDescriptor};

/// Serializes model values against a registry
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Serializer<'a> {
    /// Serializer reading schemas from `registry`
    pub const fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Serialize a typed record or a raw structural value
    pub fn serialize(&self, value: &ModelValue) -> Result<Value> {
        match value {
            ModelValue::Null => Ok(Value::Null),
            ModelValue::Opaque(json) => Ok(json.clone()),
            ModelValue::Int(_) => encode_scalar(value, PrimitiveKind::Int),
            ModelValue::Float(_) => encode_scalar(value, PrimitiveKind::Float),
            ModelValue::Bool(_) => encode_scalar(value, PrimitiveKind::Bool),
            ModelValue::String(_) => encode_scalar(value, PrimitiveKind::String),
            ModelValue::Bytes(_) => encode_scalar(value, PrimitiveKind::Bytes),
            ModelValue::Date(_) => encode_scalar(value, PrimitiveKind::Date),
            ModelValue::DateTime(_) => encode_scalar(value, PrimitiveKind::DateTime),
            ModelValue::Enum(enum_value) => {
                let entry = self
                    .registry
                    .enum_entry(enum_value.type_name.as_str())
                    .ok_or_else(|| {
                        Report::new(Error::type_not_registered(enum_value.type_name.as_str()))
                    })?;
                encode_enum(enum_value, entry)
            }
            ModelValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.serialize(item).attach(format!("List index: {index}")))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            ModelValue::Map(entries) => entries
                .iter()
                .map(|(key, item)| -> Result<(String, Value)> {
                    let json = self.serialize(item).attach(format!("Map key: {key}"))?;
                    Ok((key.clone(), json))
                })
                .collect::<Result<Map<String, Value>>>()
                .map(Value::Object),
            ModelValue::Record(record) => self.serialize_record(record),
        }
    }

    /// Serialize a record against its registered schema
    pub fn serialize_record(&self, record: &Record) -> Result<Value> {
        let type_name = record.type_name().as_str();
        let fields = self.registry.resolved_fields(type_name)?;

        if let Some(undeclared) = record
            .fields()
            .keys()
            .find(|name| !fields.contains_key(name.as_str()))
        {
            return Err(Report::new(Error::Configuration(format!(
                "Record `{type_name}` sets field `{undeclared}`, which its schema does not declare"
            ))));
        }

        let mut object = Map::new();
        for (name, spec) in &fields {
            match record.get(name) {
                None => {}
                Some(ModelValue::Null) => {
                    if spec.nullable {
                        object.insert(spec.wire_key.clone(), Value::Null);
                    }
                }
                Some(value) => {
                    let json = self
                        .serialize_field(value, &spec.field_type)
                        .attach(format!("Field: {type_name}.{name}"))?;
                    object.insert(spec.wire_key.clone(), json);
                }
            }
        }

        Ok(Value::Object(object))
    }

    fn serialize_field(&self, value: &ModelValue, descriptor: &TypeDescriptor) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match descriptor {
            TypeDescriptor::Primitive(PrimitiveKind::Opaque) => self.serialize(value),
            TypeDescriptor::Primitive(kind) => encode_scalar(value, *kind),
            TypeDescriptor::List(element) => match value {
                ModelValue::List(items) => items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.serialize_field(item, element)
                            .attach(format!("List index: {index}"))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array),
                other => Err(shape_mismatch(descriptor, other)),
            },
            TypeDescriptor::Map(element) => match value {
                ModelValue::Map(entries) => entries
                    .iter()
                    .map(|(key, item)| -> Result<(String, Value)> {
                        let json = self
                            .serialize_field(item, element)
                            .attach(format!("Map key: {key}"))?;
                        Ok((key.clone(), json))
                    })
                    .collect::<Result<Map<String, Value>>>()
                    .map(Value::Object),
                other => Err(shape_mismatch(descriptor, other)),
            },
            TypeDescriptor::Named(name) | TypeDescriptor::Polymorphic(name) => {
                match self.registry.lookup(name.as_str()) {
                    None => Err(Report::new(Error::type_not_registered(name.as_str()))),
                    Some(RegistryEntry::Enum(entry)) => match value {
                        ModelValue::Enum(enum_value) => encode_enum(enum_value, entry),
                        ModelValue::String(wire) => Ok(Value::String(wire.clone())),
                        other => Err(shape_mismatch(descriptor, other)),
                    },
                    Some(RegistryEntry::Schema(_)) => match value {
                        ModelValue::Record(record) => {
                            let concrete = record.type_name().as_str();
                            if !self.registry.is_descendant(concrete, name.as_str()) {
                                return Err(Report::new(Error::Configuration(format!(
                                    "`{concrete}` record used where `{name}` is declared"
                                ))));
                            }
                            let mut json = self.serialize_record(record)?;
                            if concrete != name.as_str() {
                                let schema = self.registry.schema(concrete)?;
                                if let Value::Object(object) = &mut json {
                                    object.insert(
                                        DISCRIMINATOR_KEY.to_string(),
                                        Value::String(schema.discriminator_value().to_string()),
                                    );
                                }
                            }
                            Ok(json)
                        }
                        ModelValue::Map(_) | ModelValue::Opaque(_) => self.serialize(value),
                        other => Err(shape_mismatch(descriptor, other)),
                    },
                }
            }
        }
    }
}

fn shape_mismatch(descriptor: &TypeDescriptor, value: &ModelValue) -> Report<Error> {
    Report::new(Error::invalid(
        &descriptor.to_string(),
        format!("cannot encode {} value", value.kind_name()),
    ))
}
