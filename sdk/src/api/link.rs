//! Navigation links
//!
//! Dialect A responses carry links in the `link` field of the body; dialect B
//! responses carry them in the `Link` header as comma-separated
//! `<href>; key=value; key="value"` segments. Both end up as `Link`.

use std::borrow::Cow;

use error_stack::Report;
use indexmap::IndexMap;
use nom::branch::alt;
use nom::bytes::complete::{take_till, take_while1};
use nom::character::complete::{char, multispace0};
use nom::combinator::opt;
use nom::multi::{many0, separated_list0};
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{ModelValue, Record};
use crate::schema::SchemaRegistry;

const ATTR_HREF: &str = "href";
const ATTR_REL: &str = "rel";
const ATTR_TYPE: &str = "type";
const ATTR_NAME: &str = "name";

/// A navigation link to a related resource or action
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Link {
    /// Target URI
    pub href:       String,
    /// Relation tokens, `rel="edit alternate"` gives two
    pub rel:        Vec<String>,
    /// Media type of the target
    pub media_type: Option<String>,
    /// Display name of the target
    pub name:       Option<String>,
    /// Every other attribute, in wire order
    pub attributes: IndexMap<String, String>,
}

impl Link {
    /// Whether `rel` is one of this link's relation tokens
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rel.iter().any(|token| token == rel)
    }

    /// Attribute by wire name; `type` reads the media type, `rel` the space-joined tokens
    pub fn attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            ATTR_HREF => Some(Cow::Borrowed(self.href.as_str())),
            ATTR_REL => (!self.rel.is_empty()).then(|| Cow::Owned(self.rel.join(" "))),
            ATTR_TYPE => self.media_type.as_deref().map(Cow::Borrowed),
            ATTR_NAME => self.name.as_deref().map(Cow::Borrowed),
            _ => self.attributes.get(key).map(|value| Cow::Borrowed(value.as_str())),
        }
    }

    /// Whether this link has `rel` and every matcher attribute equals its value
    ///
    /// A `rel` matcher holds when each of its tokens is one of the link's tokens.
    pub fn matches(&self, rel: &str, matchers: &[(&str, &str)]) -> bool {
        self.has_rel(rel)
            && matchers.iter().all(|(key, value)| match *key {
                ATTR_REL => value.split_whitespace().all(|token| self.has_rel(token)),
                _ => self.attribute(key).as_deref() == Some(*value),
            })
    }

    fn set_attribute(&mut self, key: &str, value: String) {
        match key {
            ATTR_HREF => self.href = value,
            ATTR_REL => self.rel = value.split_whitespace().map(str::to_string).collect(),
            ATTR_TYPE => self.media_type = Some(value),
            ATTR_NAME => self.name = Some(value),
            _ => {
                self.attributes.insert(key.to_string(), value);
            }
        }
    }

    /// Build from a decoded `Link` record; `None` without an href
    ///
    /// Fields are keyed by their wire names, so a field declared as `media_type`
    /// with wire key `type` becomes the media type.
    pub fn from_record(record: &Record, registry: &SchemaRegistry) -> Option<Self> {
        let fields = registry.resolved_fields(record.type_name().as_str()).ok()?;
        let mut link = Self::default();
        for (field, value) in record.fields() {
            let Some(text) = scalar_text(value) else {
                continue;
            };
            let wire_key = fields
                .get(field.as_str())
                .map_or(field.as_str(), |spec| spec.wire_key.as_str());
            link.set_attribute(wire_key, text);
        }
        (!link.href.is_empty()).then_some(link)
    }

    /// Build from a raw JSON link object; `None` without an href
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut link = Self::default();
        for (key, value) in object {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(_) | Value::Bool(_) => value.to_string(),
                _ => continue,
            };
            link.set_attribute(key, text);
        }
        (!link.href.is_empty()).then_some(link)
    }

    /// Parse a `Link` header value
    pub fn parse_header(header: &str) -> Result<Vec<Self>> {
        match link_header(header) {
            Ok(("", parsed)) => Ok(parsed
                .into_iter()
                .map(|(href, params)| {
                    let mut link = Self {
                        href: href.trim().to_string(),
                        ..Self::default()
                    };
                    for (key, value) in params {
                        link.set_attribute(&key.to_ascii_lowercase(), value.to_string());
                    }
                    link
                })
                .collect()),
            Ok((remaining, _)) => Err(Report::new(Error::invalid(
                "Link header",
                format!("unexpected text `{remaining}`"),
            ))),
            Err(e) => Err(Report::new(Error::invalid("Link header", format!("{e:?}")))),
        }
    }
}

fn scalar_text(value: &ModelValue) -> Option<String> {
    match value {
        ModelValue::String(text) => Some(text.clone()),
        ModelValue::Int(number) => Some(number.to_string()),
        ModelValue::Bool(flag) => Some(flag.to_string()),
        ModelValue::Enum(value) => Some(value.constant.as_str().to_string()),
        _ => None,
    }
}

/// First link with relation `rel` whose attributes equal every matcher
pub fn find_first_link<'a>(
    links: &'a [Link],
    rel: &str,
    matchers: &[(&str, &str)],
) -> Option<&'a Link> {
    links.iter().find(|link| link.matches(rel, matchers))
}

/// Parameter name
fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, ';' | ',' | '=' | '"' | '<' | '>'))
        .parse(input)
}

/// `"value"`, commas and semicolons inside are kept
fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"')).parse(input)
}

/// Bare value up to the next separator
fn unquoted(input: &str) -> IResult<&str, &str> {
    take_till(|c| c == ';' || c == ',')
        .map(str::trim)
        .parse(input)
}

/// `; key=value`, `; key="value"` or a bare `; key`
fn param(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        (multispace0, char(';'), multispace0),
        pair(
            token,
            opt(preceded(
                (multispace0, char('='), multispace0),
                alt((quoted, unquoted)),
            )),
        ),
    )
    .map(|(key, value)| (key, value.unwrap_or_default()))
    .parse(input)
}

/// `<href>` followed by its parameters
fn link_value(input: &str) -> IResult<&str, (&str, Vec<(&str, &str)>)> {
    pair(
        delimited(char('<'), take_till(|c| c == '>'), char('>')),
        many0(param),
    )
    .parse(input)
}

fn link_header(input: &str) -> IResult<&str, Vec<(&str, Vec<(&str, &str)>)>> {
    delimited(
        multispace0,
        separated_list0((multispace0, char(','), multispace0), link_value),
        multispace0,
    )
    .parse(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::{FieldSpec, PrimitiveKind, RegistryBuilder, SchemaEntry, TypeDescriptor};

    #[test]
    fn test_header_with_quotes_and_rel_tokens() {
        let header = r#"<https://h/cloudapi/1.0.0/orgs/1>; rel="up alternate"; type="application/json", <https://h/api/org/1>;rel=edit;model=Org"#;
        let links = Link::parse_header(header).unwrap();
        assert_eq!(links.len(), 2);

        assert_eq!(links[0].href, "https://h/cloudapi/1.0.0/orgs/1");
        assert_eq!(links[0].rel, ["up", "alternate"]);
        assert_eq!(links[0].media_type.as_deref(), Some("application/json"));

        assert_eq!(links[1].href, "https://h/api/org/1");
        assert!(links[1].has_rel("edit"));
        assert_eq!(links[1].attribute("model").as_deref(), Some("Org"));
        assert_eq!(links[0].attribute("rel").as_deref(), Some("up alternate"));
    }

    #[test]
    fn test_commas_inside_brackets_and_quotes_do_not_split() {
        let header = r#"<https://h/api/query?fields=a,b>; rel=next; title="page 2, of 3""#;
        let links = Link::parse_header(header).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "https://h/api/query?fields=a,b");
        assert_eq!(links[0].attribute("title").as_deref(), Some("page 2, of 3"));
    }

    #[test]
    fn test_empty_and_malformed_headers() {
        assert!(Link::parse_header("").unwrap().is_empty());
        let report = Link::parse_header("https://h/no-brackets; rel=up").unwrap_err();
        assert!(report.current_context().is_malformed());
    }

    #[test]
    fn test_find_first_link_with_matchers() {
        let links = Link::parse_header(
            r#"<https://h/a>; rel=add; type="application/vnd.vmware.vcloud.vdc+json", <https://h/b>; rel=add; type="application/vnd.vmware.vcloud.catalog+json""#,
        )
        .unwrap();

        let catalog = find_first_link(
            &links,
            "add",
            &[("type", "application/vnd.vmware.vcloud.catalog+json")],
        )
        .unwrap();
        assert_eq!(catalog.href, "https://h/b");
        assert_eq!(find_first_link(&links, "add", &[]).unwrap().href, "https://h/a");
        assert!(find_first_link(&links, "remove", &[]).is_none());
        assert!(find_first_link(&links, "add", &[("type", "text/plain")]).is_none());
    }

    #[test]
    fn test_from_json_keeps_extra_attributes() {
        let link = Link::from_json(&json!({
            "href": "https://h/api/org/1",
            "rel": "down",
            "type": "application/vnd.vmware.vcloud.org+json",
            "name": "acme",
            "vCloudExtension": []
        }))
        .unwrap();
        assert_eq!(link.name.as_deref(), Some("acme"));
        assert!(link.attributes.is_empty());
        assert!(Link::from_json(&json!({"rel": "down"})).is_none());
    }

    #[test]
    fn test_from_record() {
        let record = Record::builder("Link")
            .field("href", "https://h/api/admin/org/1")
            .field("rel", "edit")
            .field("media_type", "application/vnd.vmware.admin.organization+json")
            .field("id", "urn:vcloud:org:1")
            .build();
        let registry = SchemaRegistry::with_builtin_models().unwrap();
        let link = Link::from_record(&record, &registry).unwrap();
        assert_eq!(
            link.media_type.as_deref(),
            Some("application/vnd.vmware.admin.organization+json")
        );
        assert!(!link.attributes.contains_key("media_type"));
        assert!(link.matches(
            "edit",
            &[
                ("type", "application/vnd.vmware.admin.organization+json"),
                ("id", "urn:vcloud:org:1")
            ]
        ));
        assert!(Link::from_record(&Record::builder("Gateway").build(), &registry).is_none());
    }

    #[test]
    fn test_from_record_uses_wire_keys_of_link_subtypes() {
        let registry = RegistryBuilder::new()
            .with_builtin_models()
            .unwrap()
            .register_schema(
                SchemaEntry::builder("VersionedLink")
                    .parent("Link")
                    .field(
                        "api_version",
                        FieldSpec::new(
                            "apiVersion",
                            TypeDescriptor::Primitive(PrimitiveKind::String),
                        ),
                    )
                    .build(),
            )
            .unwrap()
            .build()
            .unwrap();
        let record = Record::builder("VersionedLink")
            .field("href", "https://h/api/versions")
            .field("rel", "down")
            .field("api_version", "38.0")
            .build();

        let link = Link::from_record(&record, &registry).unwrap();
        assert_eq!(link.attribute("apiVersion").as_deref(), Some("38.0"));
        assert!(find_first_link(&[link], "down", &[("apiVersion", "38.0")]).is_some());
    }

    #[test]
    fn test_rel_matcher_checks_tokens() {
        let links =
            Link::parse_header(r#"<https://h/a>; rel="edit alternate", <https://h/b>; rel=edit"#)
                .unwrap();
        assert_eq!(
            find_first_link(&links, "edit", &[("rel", "alternate")]).unwrap().href,
            "https://h/a"
        );
        assert!(find_first_link(&links, "edit", &[("rel", "remove")]).is_none());
    }
}
