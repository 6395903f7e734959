//! Structured, redacting log sink.
//!
//! All pipeline logging goes through [`emit`]. Entries become `tracing` events
//! and the subscriber installed by [`init`] writes them to stderr, keeping
//! stdout free for protocol frames.

use crate::metadata::CallMetadata;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Normalized (lower-case, no `_`/`-`) keys whose values are never logged.
const SENSITIVE_KEYS: &[&str] = &[
    "token",
    "apitoken",
    "accesstoken",
    "refreshtoken",
    "authtoken",
    "sessiontoken",
    "secret",
    "clientsecret",
    "secretaccesskey",
    "password",
    "passwd",
    "apikey",
    "authorization",
    "credential",
    "credentials",
    "accesskeyid",
    "privatekey",
    "cookie",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable output for local runs
    Pretty,
}

/// Install the global subscriber. Output goes to stderr only.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().flatten_event(true).init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Emit one log entry carrying the metadata trio and redacted `fields`.
pub fn emit(level: LogLevel, message: &str, metadata: &CallMetadata, fields: Value) {
    let details = redact(fields);
    match level {
        LogLevel::Info => tracing::info!(
            tool_name = %metadata.tool_name,
            operation = %metadata.operation,
            correlation_id = %metadata.correlation_id,
            details = %details,
            "{}",
            message
        ),
        LogLevel::Warn => tracing::warn!(
            tool_name = %metadata.tool_name,
            operation = %metadata.operation,
            correlation_id = %metadata.correlation_id,
            details = %details,
            "{}",
            message
        ),
        LogLevel::Error => tracing::error!(
            tool_name = %metadata.tool_name,
            operation = %metadata.operation,
            correlation_id = %metadata.correlation_id,
            details = %details,
            "{}",
            message
        ),
    }
}

pub fn info(message: &str, metadata: &CallMetadata, fields: Value) {
    emit(LogLevel::Info, message, metadata, fields);
}

pub fn warn(message: &str, metadata: &CallMetadata, fields: Value) {
    emit(LogLevel::Warn, message, metadata, fields);
}

pub fn error(message: &str, metadata: &CallMetadata, fields: Value) {
    emit(LogLevel::Error, message, metadata, fields);
}

/// Replace the value of every sensitive key, at any depth.
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if is_sensitive_key(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    SENSITIVE_KEYS.contains(&normalized.as_str())
}
