//! HTTP exchange behind a trait
//!
//! The dispatcher builds an `HttpRequest` and hands it to a `Transport`. Status codes
//! are never errors at this layer: any response that arrives is returned as-is, and
//! only failures to complete the exchange become `Transport` errors.

use error_stack::Report;
use reqwest::Url;
use reqwest::header::HeaderMap;
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// HTTP methods the API uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    /// Read
    Get,
    /// Create or invoke an action
    Post,
    /// Replace
    Put,
    /// Partial update
    Patch,
    /// Remove
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// A fully prepared request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Method
    pub method:  HttpMethod,
    /// Absolute URL including the query string
    pub url:     Url,
    /// Accept, content type and credential headers
    pub headers: HeaderMap,
    /// Serialized body
    pub body:    Option<Vec<u8>>,
}

/// A response as received, whatever its status
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// Status code
    pub status:  u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub body:    Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// A header value, when present and valid text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Whether the body is empty or only whitespace
    pub fn is_body_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }
}

/// Performs one HTTP exchange
pub trait Transport {
    /// Send `request` and return the response, whatever its status
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// Default transport over a blocking reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Client honoring the configured timeout and TLS verification
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if !config.verify_tls {
            warn!("TLS certificate verification is disabled");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| {
                Report::new(Error::Configuration(format!(
                    "Failed to build HTTP client: {e}"
                )))
            })?;

        Ok(Self { client })
    }

    /// Transport over an existing client
    pub const fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self
            .client
            .request(method.into(), url.clone())
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .map_err(|e| handle_error(&e, method, &url))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| handle_error(&e, method, &url))?
            .to_vec();

        debug!(
            method = method.as_str(),
            url = %url,
            status,
            bytes = body.len(),
            "HTTP exchange complete"
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Classify a reqwest failure and attach request context
fn handle_error(e: &reqwest::Error, method: HttpMethod, url: &Url) -> Report<Error> {
    warn!(method = method.as_str(), url = %url, error = %e, "HTTP request failed");

    let error_type = if e.is_timeout() {
        "Timeout"
    } else if e.is_connect() {
        "Connection failed"
    } else if e.is_request() {
        "Request error"
    } else if e.is_body() {
        "Body error"
    } else if e.is_decode() {
        "Decode error"
    } else {
        "Unknown error type"
    };

    let context_info = [
        format!("Method: {}", method.as_str()),
        format!("URL: {url}"),
        format!("Error type: {error_type}"),
    ];

    Report::new(Error::failed_to(
        &format!("send {} request", method.as_str()),
        format!("{error_type}: {e}"),
    ))
    .attach(context_info.join(", "))
    .attach(format!("Full error: {e:?}"))
}
