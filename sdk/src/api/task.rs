//! Task references and task monitors

use std::thread;
use std::time::{Duration, Instant};

use error_stack::Report;
use tracing::debug;

use crate::constants::{DEFAULT_TASK_POLL_INTERVAL_SECS, DEFAULT_TASK_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::model::{EnumValue, Model, ModelEnum, ModelValue, Record, TaskStatus, TaskType};

/// Handle to a server-side asynchronous operation
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRef {
    href:   String,
    record: Record,
}

impl TaskRef {
    /// A task fetched from `href`, whatever the record itself reports
    pub fn new(href: impl Into<String>, record: Record) -> Self {
        Self {
            href: href.into(),
            record,
        }
    }

    /// Wrap a decoded `Task` record; `None` when it has no href to poll
    pub fn from_record(record: Record) -> Option<Self> {
        let href = record.get_str("href")?.to_string();
        Some(Self { href, record })
    }

    /// URI the task can be re-fetched from
    pub fn href(&self) -> &str {
        &self.href
    }

    /// The task as decoded
    pub const fn record(&self) -> &Record {
        &self.record
    }

    /// Current status, when the server reported one
    pub fn status(&self) -> Option<TaskStatus> {
        let value = match self.record.get("status")? {
            ModelValue::Enum(value) => value.clone(),
            ModelValue::String(wire) => {
                let entry = TaskStatus::entry();
                entry.constant_for(wire).map_or_else(
                    || EnumValue::unknown(TaskStatus::TYPE_NAME, wire.as_str()),
                    |constant| EnumValue::known(TaskStatus::TYPE_NAME, constant),
                )
            }
            _ => return None,
        };
        TaskStatus::from_enum_value(&value).ok()
    }

    /// Typed view of the task
    pub fn typed(&self) -> Result<TaskType> {
        TaskType::from_record(&self.record)
    }

    /// Whether the task has stopped
    pub fn is_terminal(&self) -> bool {
        self.status().is_some_and(|status| status.is_terminal())
    }

    /// The task itself when it succeeded or is still running, a transport error when it failed
    pub fn into_result(self) -> Result<Self> {
        let Some(status) = self.status() else {
            return Ok(self);
        };
        if !matches!(
            status,
            TaskStatus::Error | TaskStatus::Canceled | TaskStatus::Aborted
        ) {
            return Ok(self);
        }

        let message = self
            .typed()
            .ok()
            .and_then(|task| task.error)
            .and_then(|error| error.message)
            .unwrap_or_else(|| format!("task ended with status {}", status.to_enum_value().constant.as_str()));

        Err(Report::new(Error::failed_to("complete task", message))
            .attach(format!("Task: {}", self.href)))
    }
}

/// Waits for a task to reach a terminal status
///
/// `fetch` re-reads a task by href; the dispatcher supplies one backed by its transport.
pub trait TaskMonitor {
    /// Block until `task` is terminal and return its final state
    fn wait(&self, task: &TaskRef, fetch: &dyn Fn(&str) -> Result<TaskRef>) -> Result<TaskRef>;
}

/// Re-fetches the task on a fixed interval until it finishes or the timeout passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingTaskMonitor {
    /// Delay between fetches
    pub poll_interval: Duration,
    /// Total time allowed
    pub timeout:       Duration,
}

impl PollingTaskMonitor {
    /// Monitor with explicit timing
    pub const fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for PollingTaskMonitor {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_TASK_POLL_INTERVAL_SECS),
            Duration::from_secs(DEFAULT_TASK_TIMEOUT_SECS),
        )
    }
}

impl TaskMonitor for PollingTaskMonitor {
    fn wait(&self, task: &TaskRef, fetch: &dyn Fn(&str) -> Result<TaskRef>) -> Result<TaskRef> {
        if task.is_terminal() {
            return Ok(task.clone());
        }

        let started = Instant::now();
        let mut polls = 0_u32;
        loop {
            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                return Err(Report::new(Error::failed_to(
                    "wait for task",
                    format!("timed out after {}s", self.timeout.as_secs()),
                ))
                .attach(format!("Task: {}", task.href()))
                .attach(format!("Polls: {polls}")));
            }
            thread::sleep(self.poll_interval.min(self.timeout - elapsed));

            let current = fetch(task.href())?;
            polls += 1;
            debug!(
                href = current.href(),
                status = ?current.status(),
                polls,
                "Polled task"
            );
            if current.is_terminal() {
                return Ok(current);
            }
        }
    }
}
