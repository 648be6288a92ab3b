use serde_json::Value;
use std::fmt;
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Structured log destination.
///
/// Only `log` is required; the level helpers forward to it.
pub trait LoggingSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &str, data: Option<&Value>);

    fn debug(&self, message: &str, context: &str, data: Option<&Value>) {
        self.log(LogLevel::Debug, message, context, data);
    }

    fn info(&self, message: &str, context: &str, data: Option<&Value>) {
        self.log(LogLevel::Info, message, context, data);
    }

    fn warning(&self, message: &str, context: &str, data: Option<&Value>) {
        self.log(LogLevel::Warning, message, context, data);
    }

    fn error(&self, message: &str, context: &str, data: Option<&Value>) {
        self.log(LogLevel::Error, message, context, data);
    }
}

/// Sink that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LoggingSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str, context: &str, data: Option<&Value>) {
        let data = data.map(Value::to_string).unwrap_or_default();
        match level {
            LogLevel::Debug => event!(Level::DEBUG, context, data = %data, "{}", message),
            LogLevel::Info => event!(Level::INFO, context, data = %data, "{}", message),
            LogLevel::Warning => event!(Level::WARN, context, data = %data, "{}", message),
            LogLevel::Error => event!(Level::ERROR, context, data = %data, "{}", message),
        }
    }
}
