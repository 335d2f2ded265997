//! Value codec for scalars, dates and enums
//!
//! Dates and datetimes travel as ISO-8601 strings, bytes as standard base64 and enum
//! constants as their registered wire strings. Decoding is strict: a value that does
//! not parse as its declared kind is a `MalformedValue` error, never a coerced default.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use error_stack::Report;
use serde_json::{Number, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{EnumConstant, EnumValue, ModelValue};
use crate::schema::{EnumEntry, PrimitiveKind};

/// Offset-carrying datetime layouts tried after RFC 3339
const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y%m%dT%H%M%S%.f%z",
];

/// Local datetime layouts, read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// JSON type name used in error messages
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong_json_kind(kind: PrimitiveKind, value: &Value) -> Report<Error> {
    Report::new(Error::invalid(
        kind.as_ref(),
        format!("expected {kind}, found {}", json_kind(value)),
    ))
}

fn wrong_model_kind(kind: PrimitiveKind, value: &ModelValue) -> Report<Error> {
    Report::new(Error::invalid(
        kind.as_ref(),
        format!("cannot encode {} value as {kind}", value.kind_name()),
    ))
}

/// Render an ISO-8601 datetime the way the API emits them
pub fn format_datetime(datetime: &DateTime<FixedOffset>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Encode one scalar as its wire value
pub fn encode_scalar(value: &ModelValue, kind: PrimitiveKind) -> Result<Value> {
    match (kind, value) {
        (_, ModelValue::Null) => Ok(Value::Null),
        (PrimitiveKind::Opaque, ModelValue::Opaque(json)) => Ok(json.clone()),
        (PrimitiveKind::Int | PrimitiveKind::Opaque, ModelValue::Int(i)) => {
            Ok(Value::Number((*i).into()))
        }
        (PrimitiveKind::Float | PrimitiveKind::Opaque, ModelValue::Float(f)) => {
            Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
                Report::new(Error::invalid("float", format!("{f} has no JSON form")))
            })
        }
        (PrimitiveKind::Float, ModelValue::Int(i)) => Ok(Value::Number((*i).into())),
        (PrimitiveKind::Bool | PrimitiveKind::Opaque, ModelValue::Bool(b)) => Ok(Value::Bool(*b)),
        (PrimitiveKind::String | PrimitiveKind::Opaque, ModelValue::String(s)) => {
            Ok(Value::String(s.clone()))
        }
        (PrimitiveKind::Bytes | PrimitiveKind::Opaque, ModelValue::Bytes(bytes)) => {
            Ok(Value::String(BASE64.encode(bytes)))
        }
        (PrimitiveKind::Date | PrimitiveKind::Opaque, ModelValue::Date(date)) => {
            Ok(Value::String(date.format("%Y-%m-%d").to_string()))
        }
        (PrimitiveKind::DateTime | PrimitiveKind::Opaque, ModelValue::DateTime(datetime)) => {
            Ok(Value::String(format_datetime(datetime)))
        }
        // Already-rendered strings are accepted once they parse
        (PrimitiveKind::Date, ModelValue::String(s)) => {
            decode_date(s)?;
            Ok(Value::String(s.clone()))
        }
        (PrimitiveKind::DateTime, ModelValue::String(s)) => {
            decode_datetime(s)?;
            Ok(Value::String(s.clone()))
        }
        (kind, other) => Err(wrong_model_kind(kind, other)),
    }
}

/// Decode one wire scalar as `kind`
pub fn decode_scalar(value: &Value, kind: PrimitiveKind) -> Result<ModelValue> {
    match kind {
        PrimitiveKind::Int => value
            .as_i64()
            .map(ModelValue::Int)
            .ok_or_else(|| wrong_json_kind(kind, value)),
        PrimitiveKind::Float => value
            .as_f64()
            .map(ModelValue::Float)
            .ok_or_else(|| wrong_json_kind(kind, value)),
        PrimitiveKind::Bool => value
            .as_bool()
            .map(ModelValue::Bool)
            .ok_or_else(|| wrong_json_kind(kind, value)),
        PrimitiveKind::String => value
            .as_str()
            .map(|s| ModelValue::String(s.to_string()))
            .ok_or_else(|| wrong_json_kind(kind, value)),
        PrimitiveKind::Bytes => {
            let encoded = value.as_str().ok_or_else(|| wrong_json_kind(kind, value))?;
            BASE64
                .decode(encoded)
                .map(ModelValue::Bytes)
                .map_err(|e| Report::new(Error::invalid("bytes", e)))
        }
        PrimitiveKind::Date => {
            let text = value.as_str().ok_or_else(|| wrong_json_kind(kind, value))?;
            decode_date(text).map(ModelValue::Date)
        }
        PrimitiveKind::DateTime => {
            let text = value.as_str().ok_or_else(|| wrong_json_kind(kind, value))?;
            decode_datetime(text).map(ModelValue::DateTime)
        }
        PrimitiveKind::Opaque => Ok(ModelValue::Opaque(value.clone())),
    }
}

/// Parse any ISO-8601 datetime
///
/// Datetimes without an offset are read as UTC; a bare date means midnight UTC.
pub fn decode_datetime(text: &str) -> Result<DateTime<FixedOffset>> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed);
    }

    // chrono's `%z` does not accept the `Z` designator
    let normalized = text
        .strip_suffix(['Z', 'z'])
        .map_or_else(|| text.to_string(), |head| format!("{head}+00:00"));

    if let Some(parsed) = OFFSET_DATETIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(&normalized, format).ok())
    {
        return Ok(parsed);
    }

    if let Some(parsed) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Ok(parsed.and_utc().fixed_offset());
    }

    if let Some(date) = parse_date_only(text) {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset());
    }

    Err(Report::new(Error::invalid("datetime", format!("`{text}`"))))
}

/// Parse an ISO-8601 date, or the date part of a full datetime
pub fn decode_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    if let Some(date) = parse_date_only(text) {
        return Ok(date);
    }
    decode_datetime(text)
        .map(|datetime| datetime.date_naive())
        .map_err(|_| Report::new(Error::invalid("date", format!("`{text}`"))))
}

fn parse_date_only(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Encode an enum constant as its registered wire string
pub fn encode_enum(value: &EnumValue, entry: &EnumEntry) -> Result<Value> {
    match &value.constant {
        EnumConstant::Known(constant) => entry
            .wire_for(constant)
            .map(|wire| Value::String(wire.to_string()))
            .ok_or_else(|| {
                Report::new(Error::invalid(
                    &format!("{} value", entry.type_name),
                    format!("constant `{constant}` is not mapped"),
                ))
            }),
        EnumConstant::Unknown(raw) => Ok(Value::String(raw.clone())),
    }
}

/// Decode a wire string against an enum mapping
///
/// Values the mapping does not know become `EnumConstant::Unknown` so newer servers
/// do not break older clients.
pub fn decode_enum(value: &Value, entry: &EnumEntry) -> Result<EnumValue> {
    let wire = value.as_str().ok_or_else(|| {
        Report::new(Error::invalid(
            &format!("{} value", entry.type_name),
            format!("expected string, found {}", json_kind(value)),
        ))
    })?;

    Ok(entry.constant_for(wire).map_or_else(
        || {
            debug!(enum_type = %entry.type_name, wire, "Unmapped enum value kept as unknown");
            EnumValue::unknown(entry.type_name.clone(), wire)
        },
        |constant| EnumValue::known(entry.type_name.clone(), constant),
    ))
}
