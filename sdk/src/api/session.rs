//! Credentials attached to every request

use error_stack::Report;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::constants::HEADER_VCLOUD_AUTHORIZATION;
use crate::error::{Error, Result};

/// An established session's credential
///
/// Logging in is the caller's business; the dispatcher only forwards the token.
#[derive(Clone, PartialEq, Eq)]
pub enum Session {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Legacy `x-vcloud-authorization: <token>`
    VcloudToken(String),
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens stay out of logs
        match self {
            Self::Bearer(_) => f.write_str("Session::Bearer(..)"),
            Self::VcloudToken(_) => f.write_str("Session::VcloudToken(..)"),
        }
    }
}

impl Session {
    /// Add the credential header
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let (name, value) = match self {
            Self::Bearer(token) => (AUTHORIZATION, format!("Bearer {token}")),
            Self::VcloudToken(token) => (
                reqwest::header::HeaderName::from_static(HEADER_VCLOUD_AUTHORIZATION),
                token.clone(),
            ),
        };

        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            Report::new(Error::Configuration(
                "Session token contains characters not allowed in a header".to_string(),
            ))
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);
        Ok(())
    }
}
