use serde::Serialize;
use uuid::Uuid;

/// Correlation data threaded through one tool invocation.
///
/// A fresh value is created at the start of every invocation and dropped when
/// the invocation ends. It is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallMetadata {
    pub tool_name: String,
    pub operation: String,
    pub correlation_id: Uuid,
}

impl CallMetadata {
    pub fn new(tool_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            operation: operation.into(),
            correlation_id: Uuid::new_v4(),
        }
    }

    /// Metadata for work done outside any tool call (bootstrap, transport).
    pub fn server(operation: impl Into<String>) -> Self {
        Self::new("server", operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_sets_identity() {
        let meta = CallMetadata::new("get_issue", "get_issue");
        assert_eq!(meta.tool_name, "get_issue");
        assert_eq!(meta.operation, "get_issue");
        assert_eq!(meta.correlation_id.get_version_num(), 4);
    }

    #[test]
    fn test_correlation_ids_are_distinct() {
        let ids: HashSet<Uuid> = (0..10_000)
            .map(|_| CallMetadata::new("search_issues", "search_issues").correlation_id)
            .collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_server_metadata() {
        let meta = CallMetadata::server("startup");
        assert_eq!(meta.tool_name, "server");
        assert_eq!(meta.operation, "startup");
    }
}
