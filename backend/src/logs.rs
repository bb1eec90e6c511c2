//! Pipeline log helpers.
//!
//! Thin wrappers around `tracing` so pipeline steps read like a progress
//! report. Every event carries a `status` field (`info`, `success`,
//! `warning`, `error`) and an indent depth for sub-steps.

use serde::{Deserialize, Serialize};

/// Log level of a pipeline message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth for sub-steps
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Emit the entry as a tracing event.
    pub fn emit(&self) {
        let status = self.level.as_str();
        let indent = "  ".repeat(self.indent as usize);
        match self.level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(status, "{}{}", indent, self.message)
            }
            LogLevel::Warning => tracing::warn!(status, "{}{}", indent, self.message),
            LogLevel::Error => tracing::error!(status, "{}{}", indent, self.message),
        }
    }
}

pub fn log_info(msg: impl Into<String>) {
    LogEntry::info(msg).emit();
}

pub fn log_success(msg: impl Into<String>) {
    LogEntry::success(msg).emit();
}

pub fn log_warning(msg: impl Into<String>) {
    LogEntry::warning(msg).emit();
}

pub fn log_error(msg: impl Into<String>) {
    LogEntry::error(msg).emit();
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LogEntry::info(msg).with_indent(indent).emit();
}

/// Install the stderr subscriber used by the CLI.
///
/// `RUST_LOG` overrides the default `legistats=info` filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("legistats=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builders() {
        let entry = LogEntry::warning("3 cells coerced").with_indent(2);
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.indent, 2);
        assert_eq!(entry.message, "3 cells coerced");
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&LogEntry::success("done")).unwrap();
        assert!(json.contains("\"success\""));
    }
}
