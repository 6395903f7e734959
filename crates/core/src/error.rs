//! Error taxonomy shared by every component of the invocation pipeline.

use crate::metadata::CallMetadata;
use serde_json::json;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure categories raised inside the pipeline.
///
/// Every variant carries the metadata of the call that produced it, so a
/// failure can always be correlated with its log lines.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Non-success response or network fault from an upstream service.
    #[error("Upstream error: {message}")]
    Upstream {
        message: String,
        status: Option<u16>,
        metadata: CallMetadata,
    },

    /// Data did not match its contract.
    #[error("Schema validation failed: {message}")]
    Schema {
        message: String,
        issues: Vec<String>,
        metadata: CallMetadata,
    },

    /// Invalid startup environment.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        metadata: CallMetadata,
    },
}

impl GatewayError {
    pub fn upstream(message: impl Into<String>, status: Option<u16>, metadata: &CallMetadata) -> Self {
        Self::Upstream {
            message: message.into(),
            status,
            metadata: metadata.clone(),
        }
    }

    pub fn schema(message: impl Into<String>, issues: Vec<String>, metadata: &CallMetadata) -> Self {
        Self::Schema {
            message: message.into(),
            issues,
            metadata: metadata.clone(),
        }
    }

    pub fn config(message: impl Into<String>, metadata: &CallMetadata) -> Self {
        Self::Config {
            message: message.into(),
            metadata: metadata.clone(),
        }
    }

    pub fn metadata(&self) -> &CallMetadata {
        match self {
            Self::Upstream { metadata, .. }
            | Self::Schema { metadata, .. }
            | Self::Config { metadata, .. } => metadata,
        }
    }

    /// Upstream status code, when the failure came from a completed response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    pub fn issues(&self) -> &[String] {
        match self {
            Self::Schema { issues, .. } => issues,
            _ => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upstream { .. } => "upstream",
            Self::Schema { .. } => "schema",
            Self::Config { .. } => "config",
        }
    }

    /// Diagnostic detail for the log sink. Never returned to callers.
    pub fn log_fields(&self) -> serde_json::Value {
        let mut fields = json!({
            "error_kind": self.kind(),
            "error": self.to_string(),
        });
        if let Some(status) = self.status() {
            fields["status"] = json!(status);
        }
        if !self.issues().is_empty() {
            fields["issues"] = json!(self.issues());
        }
        fields
    }
}
