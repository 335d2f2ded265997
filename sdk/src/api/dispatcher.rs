//! One request/response cycle
//!
//! `Dispatcher::call` picks the dialect from the URI, serializes the body, sends the
//! request through its `Transport`, decodes the response and pulls out links and the
//! task the call started. Every call returns a fresh `ResponseEnvelope`; the
//! dispatcher itself holds no per-call state.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use error_stack::{Report, ResultExt};
use indexmap::IndexMap;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use super::dialect::{ApiDialect, with_version};
use super::envelope::{CallOutput, ResponseEnvelope};
use super::link::Link;
use super::session::Session;
use super::task::{TaskMonitor, TaskRef};
use super::transport::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::codec::{Deserializer, Serializer};
use crate::config::ClientConfig;
use crate::constants::{
    DISCRIMINATOR_KEY, DOWNLOAD_FILE_PREFIX, HEADER_LINK, HEADER_LOCATION, LINK_FIELD,
    TASK_FIELD, TASKS_FIELD, TYPE_LINK, TYPE_TASK,
};
use crate::error::{Error, Result};
use crate::model::{Model, ModelValue};
use crate::schema::{SchemaRegistry, TargetType, TypeDescriptor};

const VERSION_PARAMETER: &str = "version=";

/// Everything needed to make one call
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct CallRequest {
    method:        HttpMethod,
    uri:           String,
    body:          Option<ModelValue>,
    media_type:    Option<String>,
    query:         IndexMap<String, String>,
    response_type: Option<String>,
}

impl CallRequest {
    /// A request without body, query or response type
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
            media_type: None,
            query: IndexMap::new(),
            response_type: None,
        }
    }

    /// `GET uri`
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, uri)
    }

    /// `POST uri`
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, uri)
    }

    /// `PUT uri`
    pub fn put(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, uri)
    }

    /// `DELETE uri`
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, uri)
    }

    /// Body as a record or raw structure
    pub fn body(mut self, body: impl Into<ModelValue>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Body from a typed model
    pub fn with_model<M: Model>(self, model: &M) -> Self {
        self.body(model.to_record())
    }

    /// Body from raw JSON, sent unchanged
    pub fn json_body(self, json: Value) -> Self {
        self.body(ModelValue::Opaque(json))
    }

    /// Content type override
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Add query parameters, e.g. from `QueryParamsBuilder::build`
    pub fn query(mut self, params: IndexMap<String, String>) -> Self {
        self.query.extend(params);
        self
    }

    /// Add one query parameter
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Decode the response as `expression`, e.g. `AdminOrg`, `list[Task]` or `file`
    pub fn response_type(mut self, expression: impl Into<String>) -> Self {
        self.response_type = Some(expression.into());
        self
    }

    /// Method
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// Target URI
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Executes calls against one server
#[derive(Debug)]
pub struct Dispatcher<T = ReqwestTransport> {
    transport: T,
    registry:  Arc<SchemaRegistry>,
    config:    ClientConfig,
    session:   Option<Session>,
}

impl Dispatcher<ReqwestTransport> {
    /// Dispatcher over reqwest using the global registry
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(transport, SchemaRegistry::global()?, config))
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Dispatcher over any transport and registry
    pub const fn new(transport: T, registry: Arc<SchemaRegistry>, config: ClientConfig) -> Self {
        Self {
            transport,
            registry,
            config,
            session: None,
        }
    }

    /// Attach a session credential to every request
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace or clear the session credential
    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
    }

    /// Registry used for (de)serialization
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Active configuration
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one call
    pub fn call(&self, request: CallRequest) -> Result<ResponseEnvelope> {
        let CallRequest {
            method,
            uri,
            body,
            media_type,
            query,
            response_type,
        } = request;

        let mut url = Url::parse(&uri).map_err(|e| {
            Report::new(Error::Configuration(format!(
                "Invalid request URI `{uri}`: {e}"
            )))
        })?;
        let dialect = ApiDialect::classify_url(&url)?;
        let target = response_type
            .as_deref()
            .map(|expression| self.resolve_target(expression))
            .transpose()?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query {
                pairs.append_pair(key, value);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            header_value(&dialect.accept_header(&self.config.api_version))?,
        );

        let body = match &body {
            Some(value) => {
                let json = Serializer::new(&self.registry)
                    .serialize(value)
                    .attach(format!("Request: {method} {url}"))?;
                let content_type = self.content_type(dialect, value, media_type.as_deref());
                headers.insert(CONTENT_TYPE, header_value(&content_type)?);
                Some(serde_json::to_vec(&json).map_err(|e| {
                    Report::new(Error::invalid("request body", e))
                })?)
            }
            None => None,
        };

        if let Some(session) = &self.session {
            session.apply(&mut headers)?;
        }

        debug!(
            method = method.as_str(),
            url = %url,
            dialect = %dialect,
            response_type = response_type.as_deref().unwrap_or("-"),
            "Dispatching call"
        );

        let response = self
            .transport
            .send(HttpRequest {
                method,
                url: url.clone(),
                headers,
                body,
            })
            .attach(format!("Request: {method} {url}"))?;

        if !response.is_success() {
            warn!(
                method = method.as_str(),
                url = %url,
                status = response.status,
                "Call returned non-success status"
            );
        }

        let output = self
            .read_output(&response, target.as_ref())
            .attach(format!("Request: {method} {url}"))
            .attach(format!("HTTP status: {}", response.status))?;

        let links = match dialect {
            ApiDialect::Api => links_from_output(&output, &self.registry),
            ApiDialect::CloudApi => links_from_headers(&response.headers),
        };

        let task = match dialect {
            ApiDialect::Api => self.task_from_output(&output),
            ApiDialect::CloudApi if response.is_success() => self.task_from_location(&response)?,
            ApiDialect::CloudApi => None,
        };

        debug!(
            status = response.status,
            links = links.len(),
            task = task.as_ref().map_or("-", TaskRef::href),
            "Call complete"
        );

        Ok(ResponseEnvelope {
            status: response.status,
            headers: response.headers,
            links,
            task,
            output,
        })
    }

    /// `GET uri` decoded as `response_type`
    pub fn get(&self, uri: &str, response_type: &str) -> Result<ResponseEnvelope> {
        self.call(CallRequest::get(uri).response_type(response_type))
    }

    /// `POST` a typed model, decoding the response as `response_type`
    pub fn post_model<M: Model>(
        &self,
        uri: &str,
        model: &M,
        response_type: &str,
    ) -> Result<ResponseEnvelope> {
        self.call(
            CallRequest::post(uri)
                .with_model(model)
                .response_type(response_type),
        )
    }

    /// `PUT` a typed model, decoding the response as `response_type`
    pub fn put_model<M: Model>(
        &self,
        uri: &str,
        model: &M,
        response_type: &str,
    ) -> Result<ResponseEnvelope> {
        self.call(
            CallRequest::put(uri)
                .with_model(model)
                .response_type(response_type),
        )
    }

    /// `DELETE uri`
    pub fn delete(&self, uri: &str) -> Result<ResponseEnvelope> {
        self.call(CallRequest::delete(uri))
    }

    /// Re-read a task by href
    pub fn fetch_task(&self, href: &str) -> Result<TaskRef> {
        let envelope = self.get(href, TYPE_TASK)?.error_for_status()?;
        let record = envelope
            .record()
            .cloned()
            .ok_or_else(|| Report::new(Error::missing("task in response")))
            .attach(format!("Task: {href}"))?;
        let own_href = record
            .get_str("href")
            .map_or_else(|| href.to_string(), str::to_string);
        Ok(TaskRef::new(own_href, record))
    }

    /// Wait for `task` through `monitor`; a task that ends failed is an error
    pub fn wait_for_task(&self, task: &TaskRef, monitor: &dyn TaskMonitor) -> Result<TaskRef> {
        let fetch = |href: &str| self.fetch_task(href);
        monitor.wait(task, &fetch)?.into_result()
    }

    /// Wait for the task an envelope carries, if any
    pub fn wait_for_envelope_task(
        &self,
        envelope: &ResponseEnvelope,
        monitor: &dyn TaskMonitor,
    ) -> Result<Option<TaskRef>> {
        envelope
            .task
            .as_ref()
            .map(|task| self.wait_for_task(task, monitor))
            .transpose()
    }

    /// Parse a response type, rejecting unregistered names before anything is sent
    fn resolve_target(&self, expression: &str) -> Result<TargetType> {
        let target = TargetType::parse(expression)?;
        if let Some(missing) = target.descriptor().and_then(|descriptor| {
            descriptor
                .referenced_types()
                .into_iter()
                .find(|name| self.registry.lookup(name.as_str()).is_none())
        }) {
            return Err(Report::new(Error::type_not_registered(missing.as_str()))
                .attach(format!("Response type: {expression}")));
        }
        Ok(target)
    }

    /// Override, else the record's schema media type on dialect A, else the dialect default
    fn content_type(&self, dialect: ApiDialect, body: &ModelValue, media_type: Option<&str>) -> String {
        let base = media_type
            .map(str::to_string)
            .or_else(|| match (dialect, body) {
                (ApiDialect::Api, ModelValue::Record(record)) => self
                    .registry
                    .schema(record.type_name().as_str())
                    .ok()
                    .and_then(|schema| schema.media_type.clone()),
                _ => None,
            })
            .unwrap_or_else(|| dialect.media_type().to_string());

        if base.contains(VERSION_PARAMETER) {
            base
        } else {
            with_version(&base, &self.config.api_version)
        }
    }

    fn read_output(&self, response: &HttpResponse, target: Option<&TargetType>) -> Result<CallOutput> {
        match target {
            Some(TargetType::File) if response.is_success() => {
                self.persist_download(&response.body).map(CallOutput::File)
            }
            Some(TargetType::Decode(descriptor)) if response.is_success() => {
                if response.is_body_empty() {
                    return Ok(CallOutput::None);
                }
                let json: Value = serde_json::from_slice(&response.body)
                    .map_err(|e| Report::new(Error::invalid("JSON response body", e)))?;
                Ok(Deserializer::new(&self.registry)
                    .decode(&json, descriptor)?
                    .map_or(CallOutput::None, CallOutput::Decoded))
            }
            _ => Ok(raw_output(response)),
        }
    }

    fn persist_download(&self, body: &[u8]) -> Result<PathBuf> {
        let dir = self.config.download_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Report::new(Error::io_failed("create directory", &dir, e)))?;

        let mut file = tempfile::Builder::new()
            .prefix(DOWNLOAD_FILE_PREFIX)
            .tempfile_in(&dir)
            .map_err(|e| Report::new(Error::io_failed("create download file in", &dir, e)))?;
        file.write_all(body)
            .map_err(|e| Report::new(Error::io_failed("write", file.path(), e)))?;
        let (_, path) = file
            .keep()
            .map_err(|e| Report::new(Error::io_failed("keep download in", &dir, e.error)))?;

        debug!(path = %path.display(), bytes = body.len(), "Persisted download");
        Ok(path)
    }

    /// Task carried by a dialect A body: the body itself, or the first of its `tasks`
    ///
    /// An undecodable raw task entry is logged and skipped; it never fails the call.
    fn task_from_output(&self, output: &CallOutput) -> Option<TaskRef> {
        match output {
            CallOutput::Decoded(ModelValue::Record(record)) => {
                if self.registry.is_descendant(record.type_name().as_str(), TYPE_TASK) {
                    return TaskRef::from_record(record.clone());
                }
                first_task(record.get(TASKS_FIELD))
            }
            CallOutput::Raw(json) => {
                let is_task = json
                    .get(DISCRIMINATOR_KEY)
                    .and_then(Value::as_str)
                    .is_some_and(|value| self.registry.resolve_discriminator(TYPE_TASK, value).is_ok());
                let candidate = if is_task { Some(json) } else { first_raw_task(json) }?;
                match Deserializer::new(&self.registry)
                    .decode(candidate, &TypeDescriptor::polymorphic(TYPE_TASK))
                {
                    Ok(decoded) => decoded
                        .and_then(ModelValue::into_record)
                        .and_then(TaskRef::from_record),
                    Err(report) => {
                        warn!(error = ?report, "Ignoring undecodable task in response body");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    /// Task a dialect B call points at through `Location`
    fn task_from_location(&self, response: &HttpResponse) -> Result<Option<TaskRef>> {
        let Some(location) = response.header(HEADER_LOCATION) else {
            return Ok(None);
        };
        debug!(location, "Following Location header to task");
        self.fetch_task(location)
            .attach(format!("Location: {location}"))
            .map(Some)
    }
}

fn header_value(text: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(text).map_err(|_| {
        Report::new(Error::Configuration(format!(
            "Invalid header value `{text}`"
        )))
    })
}

/// JSON body kept as-is; text that is not JSON is kept as a string
fn raw_output(response: &HttpResponse) -> CallOutput {
    if response.is_body_empty() {
        return CallOutput::None;
    }
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(Value::Null) => CallOutput::None,
        Ok(json) => CallOutput::Raw(json),
        Err(_) => CallOutput::Raw(Value::String(
            String::from_utf8_lossy(&response.body).into_owned(),
        )),
    }
}

fn links_from_output(output: &CallOutput, registry: &SchemaRegistry) -> Vec<Link> {
    match output {
        CallOutput::Decoded(ModelValue::Record(record)) => record
            .get_list(LINK_FIELD)
            .unwrap_or_default()
            .iter()
            .filter_map(ModelValue::as_record)
            .filter(|link| registry.is_descendant(link.type_name().as_str(), TYPE_LINK))
            .filter_map(|link| Link::from_record(link, registry))
            .collect(),
        CallOutput::Raw(json) => json
            .get(LINK_FIELD)
            .and_then(Value::as_array)
            .map(|links| links.iter().filter_map(Link::from_json).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn links_from_headers(headers: &HeaderMap) -> Vec<Link> {
    headers
        .get_all(HEADER_LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| {
            Link::parse_header(value).unwrap_or_else(|report| {
                warn!(header = value, error = ?report, "Ignoring malformed Link header");
                Vec::new()
            })
        })
        .collect()
}

/// First entry of a `tasks` field: a plain list, or `TasksInProgress { task: [...] }`
fn first_task(tasks: Option<&ModelValue>) -> Option<TaskRef> {
    let first = match tasks? {
        ModelValue::List(items) => items.first(),
        ModelValue::Record(in_progress) => in_progress.get_list(TASK_FIELD)?.first(),
        _ => None,
    }?;
    TaskRef::from_record(first.as_record()?.clone())
}

fn first_raw_task(json: &Value) -> Option<&Value> {
    match json.get(TASKS_FIELD)? {
        Value::Array(items) => items.first(),
        Value::Object(in_progress) => in_progress.get(TASK_FIELD)?.as_array()?.first(),
        _ => None,
    }
}
