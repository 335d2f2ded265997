//! Client configuration
//!
//! `ClientConfig` can be deserialized from any serde source or read from the
//! environment. Unset values fall back to defaults; values that are set but invalid
//! are configuration errors rather than silently ignored.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use error_stack::Report;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{
    API_VERSION_ENV_VAR, DEFAULT_API_VERSION, DEFAULT_TIMEOUT_SECS, DOWNLOAD_DIR_ENV_VAR,
    MIN_API_MAJOR_VERSION, TIMEOUT_SECS_ENV_VAR, VERIFY_TLS_ENV_VAR,
};
use crate::error::{Error, Result};

/// A validated `major.minor` API version
///
/// Accepts `"36.0"`, `"36"`, `36` and `36.0`; majors below the oldest supported
/// version are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ApiVersion(String);

impl ApiVersion {
    /// The version as sent in the `version=` media type parameter
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Major component
    pub fn major(&self) -> u32 {
        self.0
            .split('.')
            .next()
            .and_then(|major| major.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ApiVersion {
    type Err = Report<Error>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_api_version(s.trim())
            .map(Self)
            .map_err(|reason| Report::new(Error::Configuration(reason)))
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self(DEFAULT_API_VERSION.to_string())
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = deserialize_api_version(deserializer)?;
        Ok(Self(version))
    }
}

fn parse_api_version(text: &str) -> std::result::Result<String, String> {
    let (major, minor) = text.split_once('.').unwrap_or((text, "0"));
    let major: u32 = major
        .parse()
        .map_err(|_| format!("Invalid API version `{text}`: expected major.minor"))?;
    let minor: u32 = minor
        .parse()
        .map_err(|_| format!("Invalid API version `{text}`: expected major.minor"))?;

    if major < MIN_API_MAJOR_VERSION {
        return Err(format!(
            "Invalid API version `{text}`: versions below {MIN_API_MAJOR_VERSION}.0 are not supported"
        ));
    }

    Ok(format!("{major}.{minor}"))
}

/// Deserialize and validate an API version
///
/// Accepts both number and string inputs
fn deserialize_api_version<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use std::fmt;

    use serde::de::{self, Visitor};

    struct ApiVersionVisitor;

    impl Visitor<'_> for ApiVersionVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an API version as a number or a major.minor string")
        }

        fn visit_u64<E>(self, value: u64) -> std::result::Result<String, E>
        where
            E: de::Error,
        {
            parse_api_version(&value.to_string()).map_err(E::custom)
        }

        fn visit_i64<E>(self, value: i64) -> std::result::Result<String, E>
        where
            E: de::Error,
        {
            parse_api_version(&value.to_string()).map_err(E::custom)
        }

        fn visit_f64<E>(self, value: f64) -> std::result::Result<String, E>
        where
            E: de::Error,
        {
            // Numeric versions carry a single minor digit
            let text = format!("{value:.1}");
            if text.parse::<f64>().ok() != Some(value) {
                return Err(E::invalid_value(de::Unexpected::Float(value), &self));
            }
            parse_api_version(&text).map_err(E::custom)
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<String, E>
        where
            E: de::Error,
        {
            parse_api_version(value.trim()).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(ApiVersionVisitor)
}

/// Settings for the dispatcher and its default transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Version sent in every accept and content type
    pub api_version:  ApiVersion,
    /// Verify server TLS certificates
    pub verify_tls:   bool,
    /// Transport timeout per request
    pub timeout_secs: u64,
    /// Where `file` downloads are written; the system temp dir when unset
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version:  ApiVersion::default(),
            verify_tls:   true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_dir: None,
        }
    }
}

impl ClientConfig {
    /// Read configuration from `VCD_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a key lookup, defaults for missing keys
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(version) = lookup(API_VERSION_ENV_VAR) {
            config.api_version = version
                .parse::<ApiVersion>()
                .map_err(|report| report.attach(format!("Variable: {API_VERSION_ENV_VAR}")))?;
        }

        if let Some(verify) = lookup(VERIFY_TLS_ENV_VAR) {
            config.verify_tls = parse_flag(&verify).ok_or_else(|| {
                Report::new(Error::Configuration(format!(
                    "Invalid {VERIFY_TLS_ENV_VAR} `{verify}`: expected true or false"
                )))
            })?;
        }

        if let Some(timeout) = lookup(TIMEOUT_SECS_ENV_VAR) {
            config.timeout_secs = timeout.trim().parse().map_err(|_| {
                Report::new(Error::Configuration(format!(
                    "Invalid {TIMEOUT_SECS_ENV_VAR} `{timeout}`: expected whole seconds"
                )))
            })?;
        }

        if let Some(dir) = lookup(DOWNLOAD_DIR_ENV_VAR).filter(|dir| !dir.trim().is_empty()) {
            config.download_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Use a specific API version
    #[must_use]
    pub fn with_api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = api_version;
        self
    }

    /// Use a specific download directory
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Transport timeout
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory for `file` downloads
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_api_version_forms() {
        for input in [json!("36.0"), json!("36"), json!(36), json!(36.0)] {
            let version: ApiVersion = serde_json::from_value(input.clone()).unwrap();
            assert_eq!(version.as_str(), "36.0", "{input}");
        }
        let version: ApiVersion = serde_json::from_value(json!("37.2")).unwrap();
        assert_eq!(version.major(), 37);
        let version: ApiVersion = serde_json::from_value(json!(37.2)).unwrap();
        assert_eq!(version.as_str(), "37.2");
    }

    #[test]
    fn test_api_version_rejects_float_that_would_round() {
        assert!(serde_json::from_value::<ApiVersion>(json!(36.25)).is_err());
        assert!(serde_json::from_value::<ApiVersion>(json!(37.05)).is_err());
    }

    #[test]
    fn test_api_version_rejects_old_and_garbage() {
        assert!(serde_json::from_value::<ApiVersion>(json!("9.0")).is_err());
        assert!(serde_json::from_value::<ApiVersion>(json!("latest")).is_err());
        let report = "x.y".parse::<ApiVersion>().unwrap_err();
        assert!(report.current_context().is_fatal());
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_version.as_str(), DEFAULT_API_VERSION);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.verify_tls);
    }

    #[test]
    fn test_environment_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_VERSION_ENV_VAR, "38.1"),
            (VERIFY_TLS_ENV_VAR, "off"),
            (TIMEOUT_SECS_ENV_VAR, "15"),
            (DOWNLOAD_DIR_ENV_VAR, "/var/tmp/vcd"),
        ]))
        .unwrap();
        assert_eq!(config.api_version.as_str(), "38.1");
        assert!(!config.verify_tls);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.download_dir(), PathBuf::from("/var/tmp/vcd"));
    }

    #[test]
    fn test_invalid_environment_values_are_fatal() {
        for vars in [
            [(VERIFY_TLS_ENV_VAR, "maybe")],
            [(TIMEOUT_SECS_ENV_VAR, "soon")],
            [(API_VERSION_ENV_VAR, "20.0")],
        ] {
            let report = ClientConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(report.current_context().is_fatal());
        }
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_value(json!({"api_version": 37, "verify_tls": false})).unwrap();
        assert_eq!(config.api_version.as_str(), "37.0");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }
}
