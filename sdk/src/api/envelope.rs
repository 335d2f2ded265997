//! Per-call results

use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::link::{Link, find_first_link};
use super::task::TaskRef;
use crate::error::{Error, Result};
use crate::model::{ModelField, ModelValue, Record};

const ERROR_MESSAGE_KEY: &str = "message";
const ERROR_MAJOR_CODE_KEY: &str = "majorErrorCode";
const ERROR_MINOR_CODE_KEY: &str = "minorErrorCode";

/// What the body of a call turned into
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    /// Decoded against the requested response type
    Decoded(ModelValue),
    /// JSON kept as-is: no response type was requested, or the status was not 2xx
    Raw(Value),
    /// A `file` download persisted to disk
    File(PathBuf),
    /// Empty body, or a null payload
    None,
}

/// Everything one call produced
///
/// Each call returns its own envelope, so nothing from a previous call leaks into the next.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// HTTP status
    pub status:  u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Navigation links in wire order
    pub links:   Vec<Link>,
    /// Task started by the call, if any
    pub task:    Option<TaskRef>,
    /// The body
    pub output:  CallOutput,
}

impl ResponseEnvelope {
    /// Whether the status is 2xx
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// A header value, when present and valid text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// First link with relation `rel` whose attributes equal every matcher
    pub fn find_first_link(&self, rel: &str, matchers: &[(&str, &str)]) -> Option<&Link> {
        find_first_link(&self.links, rel, matchers)
    }

    /// The decoded body
    pub const fn decoded(&self) -> Option<&ModelValue> {
        match &self.output {
            CallOutput::Decoded(value) => Some(value),
            _ => None,
        }
    }

    /// The decoded body as a record
    pub fn record(&self) -> Option<&Record> {
        self.decoded().and_then(ModelValue::as_record)
    }

    /// The raw JSON body
    pub const fn raw(&self) -> Option<&Value> {
        match &self.output {
            CallOutput::Raw(value) => Some(value),
            _ => None,
        }
    }

    /// Where a `file` download was written
    pub fn file_path(&self) -> Option<&Path> {
        match &self.output {
            CallOutput::File(path) => Some(path.as_path()),
            _ => None,
        }
    }

    /// Convert the decoded body into a typed value
    pub fn decode<M: ModelField>(&self) -> Result<M> {
        match &self.output {
            CallOutput::Decoded(value) => {
                M::from_model_value(value.clone()).attach(format!("HTTP status: {}", self.status))
            }
            CallOutput::None => M::absent().ok_or_else(|| {
                Report::new(Error::missing("response body"))
                    .attach(format!("HTTP status: {}", self.status))
            }),
            CallOutput::Raw(_) | CallOutput::File(_) => Err(Report::new(Error::invalid(
                "response body",
                "the call was not made with a decodable response type",
            ))),
        }
    }

    /// This envelope on 2xx, otherwise an error carrying the server's message
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let body = match &self.output {
            CallOutput::Raw(json) => Some(json),
            _ => None,
        };
        let text = |key: &str| {
            body.and_then(|json| json.get(key))
                .and_then(|value| match value {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(number) => Some(number.to_string()),
                    _ => None,
                })
        };

        let message = text(ERROR_MESSAGE_KEY)
            .or_else(|| body.and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| {
                StatusCode::from_u16(self.status)
                    .ok()
                    .and_then(|status| status.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        let mut report = Report::new(Error::HttpStatus {
            status: self.status,
            message,
        });
        if let Some(major) = text(ERROR_MAJOR_CODE_KEY) {
            report = report.attach(format!("Major error code: {major}"));
        }
        if let Some(minor) = text(ERROR_MINOR_CODE_KEY) {
            report = report.attach(format!("Minor error code: {minor}"));
        }
        Err(report)
    }
}
