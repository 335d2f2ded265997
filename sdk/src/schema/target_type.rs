//! Parser for response type expressions
//!
//! Callers name the shape they expect back with a small expression language:
//! - `AdminOrg` (a registered schema or enum)
//! - `string`, `int`, `datetime`, … (primitive aliases)
//! - `list[Task]`, `list[list[string]]`
//! - `map(string, Reference)` (`dict` is accepted as an alias)
//! - `file` (raw binary download, only valid at the top level)

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::verify;
use nom::sequence::{delimited, pair, preceded, separated_pair};
use nom::{IResult, Parser};

use super::{PrimitiveKind, TypeDescriptor, TypeName};
use crate::constants::TYPE_FILE;
use crate::error::{Error, Result};

/// The decoded form of a response type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    /// Structural decoding against a descriptor
    Decode(TypeDescriptor),
    /// Bypass decoding and persist the body
    File,
}

impl TargetType {
    /// Parse a type expression
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        if trimmed.eq_ignore_ascii_case(TYPE_FILE) {
            return Ok(Self::File);
        }

        match descriptor(trimmed) {
            Ok(("", parsed)) => Ok(Self::Decode(parsed)),
            Ok((remaining, _)) => Err(Error::Configuration(format!(
                "Unexpected characters after type expression `{trimmed}`: `{remaining}`"
            ))
            .into()),
            Err(e) => Err(Error::Configuration(format!(
                "Invalid type expression `{trimmed}`: {e:?}"
            ))
            .into()),
        }
    }

    /// Target for a registered type name, skipping expression parsing
    pub fn named(type_name: impl Into<TypeName>) -> Self {
        Self::Decode(TypeDescriptor::Named(type_name.into()))
    }

    /// The descriptor, when this target decodes structurally
    pub const fn descriptor(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Decode(descriptor) => Some(descriptor),
            Self::File => None,
        }
    }
}

impl std::str::FromStr for TargetType {
    type Err = error_stack::Report<Error>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a type or primitive name (alphanumeric plus `_`, `:`, `.` and `-`)
fn type_name(input: &str) -> IResult<&str, TypeDescriptor> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
        .map(|name: &str| {
            name.parse::<PrimitiveKind>().map_or_else(
                |_| TypeDescriptor::Named(TypeName::from(name)),
                TypeDescriptor::Primitive,
            )
        })
        .parse(input)
}

/// Parse `list[T]`
fn list_type(input: &str) -> IResult<&str, TypeDescriptor> {
    preceded(
        pair(tag_no_case("list"), multispace0),
        delimited(char('['), descriptor, char(']')),
    )
    .map(TypeDescriptor::list)
    .parse(input)
}

/// Parse `map(K, V)` or `dict(K, V)`; keys must be strings
fn map_type(input: &str) -> IResult<&str, TypeDescriptor> {
    preceded(
        pair(alt((tag_no_case("map"), tag_no_case("dict"))), multispace0),
        delimited(
            char('('),
            separated_pair(
                verify(descriptor, |key: &TypeDescriptor| {
                    *key == TypeDescriptor::Primitive(PrimitiveKind::String)
                }),
                char(','),
                descriptor,
            ),
            char(')'),
        ),
    )
    .map(|(_, value)| TypeDescriptor::map(value))
    .parse(input)
}

/// Parse any descriptor, tolerating surrounding whitespace
fn descriptor(input: &str) -> IResult<&str, TypeDescriptor> {
    delimited(
        multispace0,
        alt((list_type, map_type, type_name)),
        multispace0,
    )
    .parse(input)
}
