//! Wire, header and environment constants shared across the SDK
//!
//! Everything the core matches on by name lives here so the dialect rules,
//! the reserved payload keys and the configuration variables are visible in one place.

// ============================================================================
// PAYLOAD KEY CONSTANTS
// ============================================================================

/// Reserved payload key naming the concrete schema of a polymorphic record
pub const DISCRIMINATOR_KEY: &str = "_type";

/// Field carrying navigation links on dialect A records
pub const LINK_FIELD: &str = "link";

/// Field carrying in-progress tasks on dialect A records
pub const TASKS_FIELD: &str = "tasks";

/// Field holding the task list inside a `TasksInProgress` record
pub const TASK_FIELD: &str = "task";

// ============================================================================
// DIALECT CONSTANTS
// ============================================================================

/// Path segment marking the legacy API dialect
pub const API_PATH_SEGMENT: &str = "api";

/// Path segment marking the `CloudAPI` dialect
pub const CLOUDAPI_PATH_SEGMENT: &str = "cloudapi";

/// Accept/content type base for dialect A
pub const API_MEDIA_TYPE: &str = "application/*+json";

/// Accept/content type base for dialect B
pub const CLOUDAPI_MEDIA_TYPE: &str = "application/json";

// ============================================================================
// HTTP HEADER CONSTANTS
// ============================================================================

/// Header carrying navigation links on dialect B responses
pub const HEADER_LINK: &str = "link";

/// Header pointing at the task created by a dialect B request
pub const HEADER_LOCATION: &str = "location";

/// Legacy session token header
pub const HEADER_VCLOUD_AUTHORIZATION: &str = "x-vcloud-authorization";

// ============================================================================
// TYPE NAME CONSTANTS
// ============================================================================

/// Type expression requesting a raw binary download
pub const TYPE_FILE: &str = "file";

/// Registered name of the task shape
pub const TYPE_TASK: &str = "Task";

/// Registered name of the navigation link shape
pub const TYPE_LINK: &str = "Link";

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Environment variable overriding the API version
pub const API_VERSION_ENV_VAR: &str = "VCD_API_VERSION";

/// Environment variable toggling TLS certificate verification
pub const VERIFY_TLS_ENV_VAR: &str = "VCD_VERIFY_TLS";

/// Environment variable with the transport timeout in seconds
pub const TIMEOUT_SECS_ENV_VAR: &str = "VCD_TIMEOUT_SECS";

/// Environment variable naming the binary download directory
pub const DOWNLOAD_DIR_ENV_VAR: &str = "VCD_DOWNLOAD_DIR";

/// Environment variable with the initial tracing level
pub const LOG_LEVEL_ENV_VAR: &str = "VCD_LOG_LEVEL";

/// API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "36.0";

/// Transport timeout used when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Oldest API version the core understands
pub const MIN_API_MAJOR_VERSION: u32 = 27;

/// Prefix for persisted binary downloads
pub const DOWNLOAD_FILE_PREFIX: &str = "vcd-download-";

/// Delay between task status polls
pub const DEFAULT_TASK_POLL_INTERVAL_SECS: u64 = 5;

/// Give up waiting on a task after this long
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 600;
