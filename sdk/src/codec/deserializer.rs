//! JSON to model tree
//!
//! Decoding is driven by a `TargetType`. Collections recurse element-wise, primitives
//! go through the value codec, enums through their mapping, and records through the
//! registry. A polymorphic target reads `_type` from the payload and decodes against
//! the concrete schema it names. Wire keys the schema does not declare are ignored;
//! declared keys that fail to decode abort the whole call.

use std::collections::HashSet;

use error_stack::{Report, ResultExt};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use super::scalar::{decode_enum, decode_scalar, json_kind};
use crate::constants::DISCRIMINATOR_KEY;
use crate::error::{Error, Result};
use crate::model::{ModelValue, Record};
use crate::schema::{RegistryEntry, SchemaEntry, SchemaRegistry, TargetType, TypeDescriptor};

/// Deserializes JSON trees against a registry
#[derive(Debug, Clone, Copy)]
pub struct Deserializer<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Deserializer<'a> {
    /// Deserializer reading schemas from `registry`
    pub const fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Decode `json` against a parsed target; `None` for a null payload
    pub fn deserialize(&self, json: &Value, target: &TargetType) -> Result<Option<ModelValue>> {
        match target {
            TargetType::Decode(descriptor) => {
                // An unresolvable target is a setup mistake whatever the payload holds
                if let Some(missing) = descriptor
                    .referenced_types()
                    .into_iter()
                    .find(|name| self.registry.lookup(name.as_str()).is_none())
                {
                    return Err(Report::new(Error::type_not_registered(missing.as_str())));
                }
                self.decode(json, descriptor)
            }
            TargetType::File => Err(Report::new(Error::Configuration(
                "A `file` target is persisted by the dispatcher and cannot be decoded".to_string(),
            ))),
        }
    }

    /// Decode `json` against a type expression such as `list[Task]`
    pub fn deserialize_as(&self, json: &Value, expression: &str) -> Result<Option<ModelValue>> {
        let target = TargetType::parse(expression)?;
        self.deserialize(json, &target)
    }

    /// Decode `json` against a descriptor
    pub fn decode(&self, json: &Value, descriptor: &TypeDescriptor) -> Result<Option<ModelValue>> {
        if json.is_null() {
            return Ok(None);
        }

        let value = match descriptor {
            TypeDescriptor::List(element) => {
                let Value::Array(items) = json else {
                    return Err(shape_mismatch(descriptor, json));
                };
                let decoded = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self.decode(item, element)
                            .map(|value| value.unwrap_or(ModelValue::Null))
                            .attach(format!("List index: {index}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                ModelValue::List(decoded)
            }
            TypeDescriptor::Map(element) => {
                let Value::Object(entries) = json else {
                    return Err(shape_mismatch(descriptor, json));
                };
                let decoded = entries
                    .iter()
                    .map(|(key, item)| -> Result<(String, ModelValue)> {
                        let value = self
                            .decode(item, element)
                            .attach(format!("Map key: {key}"))?
                            .unwrap_or(ModelValue::Null);
                        Ok((key.clone(), value))
                    })
                    .collect::<Result<IndexMap<_, _>>>()?;
                ModelValue::Map(decoded)
            }
            TypeDescriptor::Primitive(kind) => decode_scalar(json, *kind)?,
            TypeDescriptor::Named(name) => match self.registry.lookup(name.as_str()) {
                None => return Err(Report::new(Error::type_not_registered(name.as_str()))),
                Some(RegistryEntry::Enum(entry)) => ModelValue::Enum(decode_enum(json, entry)?),
                Some(RegistryEntry::Schema(schema)) if schema.polymorphic => {
                    self.decode_polymorphic(json, schema)?
                }
                Some(RegistryEntry::Schema(schema)) => self.decode_record(json, schema)?,
            },
            TypeDescriptor::Polymorphic(base) => {
                let schema = self.registry.schema(base.as_str())?;
                self.decode_polymorphic(json, schema)?
            }
        };

        Ok(Some(value))
    }

    /// Pick the concrete schema named by `_type`, falling back to the requested one
    fn decode_polymorphic(&self, json: &Value, base: &SchemaEntry) -> Result<ModelValue> {
        let discriminator = json.get(DISCRIMINATOR_KEY).and_then(Value::as_str);

        let concrete = match discriminator {
            Some(value) if value != base.discriminator_value() => self
                .registry
                .resolve_discriminator(base.type_name.as_str(), value)?,
            _ => base,
        };

        if concrete.type_name != base.type_name {
            trace!(
                requested = %base.type_name,
                concrete = %concrete.type_name,
                "Resolved polymorphic record"
            );
        }

        self.decode_record(json, concrete)
    }

    fn decode_record(&self, json: &Value, schema: &SchemaEntry) -> Result<ModelValue> {
        let Value::Object(object) = json else {
            return Err(Report::new(Error::invalid(
                schema.type_name.as_str(),
                format!("expected object, found {}", json_kind(json)),
            )));
        };

        let type_name = schema.type_name.as_str();
        let fields = self.registry.resolved_fields(type_name)?;
        let mut builder = Record::builder(type_name);

        for (name, spec) in &fields {
            match object.get(&spec.wire_key) {
                None => {}
                Some(Value::Null) => {
                    if spec.nullable {
                        builder = builder.field(*name, ModelValue::Null);
                    }
                }
                Some(wire_value) => {
                    let decoded = self.decode(wire_value, &spec.field_type).attach(format!(
                        "Field: {type_name}.{name} (wire key `{}`)",
                        spec.wire_key
                    ))?;
                    builder = builder.maybe_field(*name, decoded);
                }
            }
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            let known: HashSet<&str> = fields
                .values()
                .map(|spec| spec.wire_key.as_str())
                .collect();
            for key in object.keys() {
                if key != DISCRIMINATOR_KEY && !known.contains(key.as_str()) {
                    trace!(type_name, key = %key, "Ignoring undeclared wire key");
                }
            }
        }

        Ok(ModelValue::Record(builder.build()))
    }
}

fn shape_mismatch(descriptor: &TypeDescriptor, json: &Value) -> Report<Error> {
    Report::new(Error::invalid(
        &descriptor.to_string(),
        format!("found {}", json_kind(json)),
    ))
}
