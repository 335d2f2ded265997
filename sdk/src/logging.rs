//! Structured logging for applications embedding the SDK
//!
//! The SDK only emits `tracing` events. `init_tracing` installs a stderr subscriber
//! whose level can be changed at runtime; hosts with their own subscriber skip it.

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use error_stack::Report;
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::constants::LOG_LEVEL_ENV_VAR;
use crate::error::{Error, Result};

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(1); // WARN until told otherwise

/// Tracing filter whose level can be updated at runtime
#[derive(Clone)]
pub struct DynamicFilter;

impl<S> Layer<S> for DynamicFilter
where
    S: Subscriber,
{
    fn enabled(
        &self,
        metadata: &tracing::Metadata<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        // HTTP connection chatter drowns out dispatcher logs
        let target = metadata.target();
        if target.starts_with("reqwest::")
            || target.starts_with("hyper")
            || target.starts_with("h2::")
            || target.starts_with("rustls::")
            || target.starts_with("want::")
        {
            return false;
        }

        TracingLevel::from_level(*metadata.level()).as_u8() <= CURRENT_LEVEL.load(Ordering::Relaxed)
    }
}

/// Tracing levels that can be set dynamically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Call summaries
    Info,
    /// Per-call dispatch details
    Debug,
    /// Codec internals such as ignored wire keys
    Trace,
}

impl TracingLevel {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
            Self::Trace => 4,
        }
    }

    const fn from_level(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }

    /// Lowercase level name
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Parse a level name, as a configuration error when unknown
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_str(text.trim()).map_err(|_| {
            Report::new(Error::Configuration(format!(
                "Invalid tracing level '{text}'. Valid levels are: error, warn, info, debug, trace"
            )))
        })
    }
}

/// Install a stderr subscriber filtered by the dynamic level
///
/// The starting level comes from `VCD_LOG_LEVEL` when set. Installing twice, or
/// alongside another global subscriber, is a no-op.
pub fn init_tracing() -> Result<()> {
    if let Ok(level) = std::env::var(LOG_LEVEL_ENV_VAR) {
        set_tracing_level(TracingLevel::parse(&level)?);
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    // Another subscriber already owns the global slot
    let _ = Registry::default()
        .with(DynamicFilter)
        .with(fmt_layer)
        .try_init();

    Ok(())
}

/// Current dynamic level
pub fn current_tracing_level() -> TracingLevel {
    match CURRENT_LEVEL.load(Ordering::Relaxed) {
        0 => TracingLevel::Error,
        2 => TracingLevel::Info,
        3 => TracingLevel::Debug,
        4 => TracingLevel::Trace,
        _ => TracingLevel::Warn,
    }
}

/// Change the dynamic level
pub fn set_tracing_level(level: TracingLevel) {
    CURRENT_LEVEL.store(level.as_u8(), Ordering::Relaxed);
    tracing::info!(level = level.as_str(), "Tracing level set");
}
