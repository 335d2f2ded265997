//! Typed views over records
//!
//! `#[derive(Model)]` and `#[derive(ModelEnum)]` implement these traits. The schema a
//! derive produces is what gets registered, and the conversions move data between the
//! typed struct and the `Record` the codec works on, so there is exactly one structural
//! description per model.

use chrono::{DateTime, FixedOffset, NaiveDate};
use error_stack::{Report, ResultExt};
use indexmap::IndexMap;
use serde_json::Value;

use super::{EnumValue, ModelValue, Record};
use crate::error::{Error, Result};
use crate::schema::{EnumEntry, PrimitiveKind, SchemaEntry, TypeDescriptor};

/// A registered record type with a typed Rust representation
pub trait Model: Sized {
    /// Registry key
    const TYPE_NAME: &'static str;

    /// Structural schema, as registered
    fn schema() -> SchemaEntry;

    /// Write this value's set fields, parent fields first
    fn write_fields(&self, fields: &mut Fields);

    /// Read a typed value out of populated fields
    fn read_fields(fields: &Fields) -> Result<Self>;

    /// Convert into a record
    fn to_record(&self) -> Record {
        let mut fields = IndexMap::new();
        self.write_fields(&mut fields);
        Record::from_parts(Self::TYPE_NAME, fields)
    }

    /// Convert from a record of this type or of any subtype
    fn from_record(record: &Record) -> Result<Self> {
        Self::read_fields(record.fields())
            .attach(format!("Record type: {}", record.type_name()))
    }
}

/// A registered enumeration with a typed Rust representation
pub trait ModelEnum: Sized {
    /// Registry key
    const TYPE_NAME: &'static str;

    /// Wire mapping, as registered
    fn entry() -> EnumEntry;

    /// Convert into an enum value
    fn to_enum_value(&self) -> EnumValue;

    /// Convert from an enum value
    fn from_enum_value(value: &EnumValue) -> Result<Self>;
}

/// A Rust type usable as a model field
pub trait ModelField: Sized {
    /// Descriptor registered for fields of this type
    fn descriptor() -> TypeDescriptor;

    /// Convert into a model value
    fn to_model_value(&self) -> ModelValue;

    /// Convert from a decoded model value
    fn from_model_value(value: ModelValue) -> Result<Self>;

    /// Value used when the field is unset; `None` makes the field required
    fn absent() -> Option<Self> {
        None
    }

    /// Whether this value leaves the field unset on the wire
    fn is_absent(&self) -> bool {
        false
    }
}

/// Populated fields of a record, keyed by field identifier
pub type Fields = IndexMap<String, ModelValue>;

fn mismatch(expected: &str, found: &ModelValue) -> Report<Error> {
    Report::new(Error::invalid(
        expected,
        format!("found {} value", found.kind_name()),
    ))
}

/// Unwrap a record value destined for a typed model
pub fn expect_record(value: ModelValue, type_name: &str) -> Result<Record> {
    match value {
        ModelValue::Record(record) => Ok(record),
        other => Err(mismatch(type_name, &other)),
    }
}

/// Unwrap an enum value destined for a typed enum
pub fn expect_enum(value: ModelValue, type_name: &str) -> Result<EnumValue> {
    match value {
        ModelValue::Enum(value) => Ok(value),
        other => Err(mismatch(type_name, &other)),
    }
}

/// Error for an enum constant the typed enum has no variant for
pub fn unmapped_constant(type_name: &str, constant: &str) -> Report<Error> {
    Report::new(Error::invalid(
        &format!("{type_name} value"),
        format!("`{constant}` has no matching variant"),
    ))
}

/// Write one typed field, skipping absent values
pub fn write_field<T: ModelField>(fields: &mut Fields, name: &str, value: &T) {
    if !value.is_absent() {
        fields.insert(name.to_string(), value.to_model_value());
    }
}

/// Read one typed field, failing when a required field is unset
pub fn read_field<T: ModelField>(fields: &Fields, type_name: &str, name: &str) -> Result<T> {
    match fields.get(name) {
        Some(value) => {
            T::from_model_value(value.clone()).attach(format!("Field: {type_name}.{name}"))
        }
        None => T::absent().ok_or_else(|| {
            Report::new(Error::missing(&format!(
                "required field `{name}` of `{type_name}`"
            )))
        }),
    }
}

impl ModelField for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::String)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::String(self.clone())
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::String(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl ModelField for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Bool)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Bool(*self)
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", &value))
    }
}

impl ModelField for i64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Int)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Int(*self)
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("int", &value))
    }
}

impl ModelField for i32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Int)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Int(i64::from(*self))
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        let wide = value.as_i64().ok_or_else(|| mismatch("int", &value))?;
        Self::try_from(wide).map_err(|e| Report::new(Error::invalid("int", e)))
    }
}

impl ModelField for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Float)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Float(*self)
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("float", &value))
    }
}

impl ModelField for NaiveDate {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Date)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Date(*self)
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::Date(date) => Ok(date),
            other => Err(mismatch("date", &other)),
        }
    }
}

impl ModelField for DateTime<FixedOffset> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::DateTime)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::DateTime(*self)
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::DateTime(datetime) => Ok(datetime),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl ModelField for Value {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Opaque)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Opaque(self.clone())
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::Opaque(json) => Ok(json),
            ModelValue::Null => Ok(Self::Null),
            other => Err(mismatch("opaque", &other)),
        }
    }
}

/// Binary field contents, base64 on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binary(pub Vec<u8>);

impl ModelField for Binary {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Bytes)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Bytes(self.0.clone())
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::Bytes(bytes) => Ok(Self(bytes)),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

/// Untyped record field; pair with `#[model(named = "...")]` to pick its schema
impl ModelField for Record {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Opaque)
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Record(self.clone())
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::Record(record) => Ok(record),
            other => Err(mismatch("record", &other)),
        }
    }
}

impl ModelField for ModelValue {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveKind::Opaque)
    }

    fn to_model_value(&self) -> ModelValue {
        self.clone()
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        Ok(value)
    }
}

impl<T: ModelField> ModelField for Option<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn to_model_value(&self) -> ModelValue {
        self.as_ref()
            .map_or(ModelValue::Null, ModelField::to_model_value)
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::Null => Ok(None),
            value => T::from_model_value(value).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

/// Empty lists stay unset; use `Option<Vec<T>>` to send an explicit `[]`
impl<T: ModelField> ModelField for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::List(self.iter().map(ModelField::to_model_value).collect())
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    T::from_model_value(item).attach(format!("List index: {index}"))
                })
                .collect(),
            other => Err(mismatch("list", &other)),
        }
    }

    fn absent() -> Option<Self> {
        Some(Self::new())
    }

    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl<T: ModelField> ModelField for IndexMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }

    fn to_model_value(&self) -> ModelValue {
        ModelValue::Map(
            self.iter()
                .map(|(key, value)| (key.clone(), value.to_model_value()))
                .collect(),
        )
    }

    fn from_model_value(value: ModelValue) -> Result<Self> {
        match value {
            ModelValue::Map(entries) => entries
                .into_iter()
                .map(|(key, value)| -> Result<(String, T)> {
                    let typed = T::from_model_value(value).attach(format!("Map key: {key}"))?;
                    Ok((key, typed))
                })
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }

    fn absent() -> Option<Self> {
        Some(Self::new())
    }

    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_option_absent_and_null() {
        assert_eq!(Option::<String>::absent(), Some(None));
        assert_eq!(
            Option::<String>::from_model_value(ModelValue::Null).unwrap(),
            None
        );
        assert!(None::<String>.is_absent());
    }

    #[test]
    fn test_required_field_missing() {
        let fields = IndexMap::new();
        let report = read_field::<String>(&fields, "Link", "href").unwrap_err();
        assert!(report.current_context().is_malformed());

        let optional: Option<String> = read_field(&fields, "Link", "rel").unwrap();
        assert_eq!(optional, None);
    }

    #[test]
    fn test_type_mismatch_is_malformed() {
        let report = i32::from_model_value(ModelValue::from("twelve")).unwrap_err();
        assert!(report.current_context().is_malformed());

        let report = i32::from_model_value(ModelValue::Int(i64::MAX)).unwrap_err();
        assert!(report.current_context().is_malformed());
    }

    #[test]
    fn test_write_field_skips_absent_values() {
        let mut fields = IndexMap::new();
        write_field(&mut fields, "name", &Some("acme".to_string()));
        write_field(&mut fields, "description", &None::<String>);
        write_field(&mut fields, "link", &Vec::<String>::new());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], ModelValue::from("acme"));
    }
}
