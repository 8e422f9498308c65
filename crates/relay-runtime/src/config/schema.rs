//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl RelayConfig {
    /// Checks every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.dispatch.validate()
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to the `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Needs the `json-log` feature; falls back to `Full` without it.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global level; `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Log file used with [`LogOutput::File`].
    pub file_path: Option<PathBuf>,
    /// Per-module levels, e.g. `relay_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
    /// Log span creation and close, e.g. for each dispatch.
    pub span_events: bool,
    pub thread_ids: bool,
    /// Include file and line of each event.
    pub file_location: bool,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Acknowledgment deadline for action handlers, in milliseconds.
    pub ack_timeout_ms: u64,

    /// Capacity of the inbound event queue.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 3000,
            queue_capacity: 256,
        }
    }
}

impl DispatchConfig {
    /// Returns the acknowledgment deadline.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Rejects zero values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.ack_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "dispatch.ack_timeout_ms must be greater than zero",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::validation(
                "dispatch.queue_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
