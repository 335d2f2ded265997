use thiserror::Error;

// Error message prefixes
const MSG_FAILED_TO_PREFIX: &str = "Failed to";
const MSG_INVALID_PREFIX: &str = "Invalid";
const MSG_MISSING_PREFIX: &str = "Missing";
const MSG_UNREGISTERED_PREFIX: &str = "Unregistered";

/// Result type for the `vcd_sdk` library
pub type Result<T> = std::result::Result<T, error_stack::Report<Error>>;

/// Error categories surfaced by the SDK core
///
/// `Configuration` errors are programming or setup mistakes and are never worth retrying.
/// `MalformedValue` errors come from payload data that does not match its declared shape.
/// `Transport` errors are owned by the HTTP layer and simply propagated.
#[derive(Error)]
pub enum Error {
    /// Unresolvable type, URI outside every dialect, conflicting registration, bad config value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Download persistence or other filesystem failure
    #[error("I/O error: {0}")]
    Io(String),

    /// A wire value could not be decoded as its declared kind
    #[error("Malformed value: {0}")]
    MalformedValue(String),

    /// Network failure, timeout or an unexpected HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// A `Named` or `Polymorphic` reference that does not resolve in the registry
    #[error("Type not registered: {type_name}")]
    TypeNotRegistered {
        /// The name that failed to resolve
        type_name: String,
    },

    /// Non-success HTTP status reported through `ResponseEnvelope::error_for_status`
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        /// HTTP status code
        status:  u16,
        /// Server supplied message, or the canonical reason
        message: String,
    },
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(s) => f.debug_tuple("Configuration").field(s).finish(),
            Self::Io(s) => f.debug_tuple("Io").field(s).finish(),
            Self::MalformedValue(s) => f.debug_tuple("MalformedValue").field(s).finish(),
            Self::Transport(s) => f.debug_tuple("Transport").field(s).finish(),
            Self::TypeNotRegistered { type_name } => f
                .debug_struct("TypeNotRegistered")
                .field("type_name", type_name)
                .finish(),
            Self::HttpStatus { status, message } => f
                .debug_struct("HttpStatus")
                .field("status", status)
                .field("message", message)
                .finish(),
        }
    }
}

impl Error {
    // Builder methods for common patterns

    /// Create a "Failed to X" transport error
    pub fn failed_to(action: &str, details: impl std::fmt::Display) -> Self {
        Self::Transport(format!("{MSG_FAILED_TO_PREFIX} {action}: {details}"))
    }

    /// Create an "Invalid X" malformed value error
    pub fn invalid(what: &str, details: impl std::fmt::Display) -> Self {
        Self::MalformedValue(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }

    /// Create a "Missing X" malformed value error
    pub fn missing(what: &str) -> Self {
        Self::MalformedValue(format!("{MSG_MISSING_PREFIX} {what}"))
    }

    /// Create an "Unregistered X" configuration error
    pub fn unregistered(what: &str, details: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("{MSG_UNREGISTERED_PREFIX} {what}: {details}"))
    }

    /// Create error for a registry reference that does not resolve
    pub fn type_not_registered(type_name: impl Into<String>) -> Self {
        Self::TypeNotRegistered {
            type_name: type_name.into(),
        }
    }

    /// Create error for IO operations on a path
    pub fn io_failed(
        operation: &str,
        path: &std::path::Path,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::Io(format!(
            "{MSG_FAILED_TO_PREFIX} {operation} {}: {error}",
            path.display()
        ))
    }

    /// Whether this error is a misconfiguration that must not be retried
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::TypeNotRegistered { .. })
    }

    /// Whether this error came from decoding a payload value
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedValue(_))
    }
}
