//! Dialect selection by URI

use error_stack::Report;
use reqwest::Url;
use strum::{Display, IntoStaticStr};

use crate::config::ApiVersion;
use crate::constants::{API_MEDIA_TYPE, API_PATH_SEGMENT, CLOUDAPI_MEDIA_TYPE, CLOUDAPI_PATH_SEGMENT};
use crate::error::{Error, Result};

/// The two parallel API surfaces a server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ApiDialect {
    /// Legacy surface under `/api`
    Api,
    /// JSON surface under `/cloudapi`
    CloudApi,
}

impl ApiDialect {
    /// Classify a fully-qualified URI by its first `api` or `cloudapi` path segment
    pub fn classify(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).map_err(|e| {
            Report::new(Error::Configuration(format!("Invalid request URI `{uri}`: {e}")))
        })?;
        Self::classify_url(&url)
    }

    /// Classify an already parsed URL
    pub fn classify_url(url: &Url) -> Result<Self> {
        url.path_segments()
            .into_iter()
            .flatten()
            .find_map(|segment| match segment {
                API_PATH_SEGMENT => Some(Self::Api),
                CLOUDAPI_PATH_SEGMENT => Some(Self::CloudApi),
                _ => None,
            })
            .ok_or_else(|| {
                Report::new(Error::Configuration(format!(
                    "URI `{url}` belongs to neither the `/{API_PATH_SEGMENT}` nor the `/{CLOUDAPI_PATH_SEGMENT}` dialect"
                )))
            })
    }

    /// Base media type for accept and default content type
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Api => API_MEDIA_TYPE,
            Self::CloudApi => CLOUDAPI_MEDIA_TYPE,
        }
    }

    /// `Accept` header value for `version`
    pub fn accept_header(self, version: &ApiVersion) -> String {
        with_version(self.media_type(), version)
    }
}

/// Append the `version` parameter to a media type
pub fn with_version(media_type: &str, version: &ApiVersion) -> String {
    format!("{media_type};version={version}")
}
