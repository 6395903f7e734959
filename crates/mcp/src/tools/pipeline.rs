//! The invocation pipeline shared by every tool.
//!
//! Each call gets fresh [`CallMetadata`], a start log, the handler run, and
//! exactly one outcome log. Expected failures are logged at warn and their
//! message is shown verbatim; unexpected errors are logged at error with full
//! detail and replaced by the tool's generic failure message.

use super::Tool;
use crate::protocol::CallToolResult;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Instant;
use taskbridge_core::{logging, CallMetadata, Envelope, GatewayError, GatewayResult};

pub async fn invoke(tool: &dyn Tool, arguments: Value) -> CallToolResult {
    let metadata = CallMetadata::new(tool.name(), tool.operation());
    let started = Instant::now();

    logging::info(
        "Tool invocation started",
        &metadata,
        json!({ "arguments": arguments, "duration_ms": 0 }),
    );

    let outcome = tool.handle(arguments, &metadata).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Envelope::Success(text)) => {
            logging::info(
                "Tool invocation completed",
                &metadata,
                json!({ "duration_ms": duration_ms }),
            );
            CallToolResult::text(text)
        }
        Ok(Envelope::Failure(message)) => {
            logging::warn(
                "Tool invocation returned a failure",
                &metadata,
                json!({ "duration_ms": duration_ms, "reason": message }),
            );
            CallToolResult::failure(message)
        }
        Err(error) => {
            let mut fields = error.log_fields();
            fields["duration_ms"] = json!(duration_ms);
            logging::error("Tool invocation failed", &metadata, fields);
            CallToolResult::failure(tool.failure_message(&error))
        }
    }
}

/// Decode already schema-checked tool arguments into their typed form.
pub fn decode_arguments<T: DeserializeOwned>(arguments: Value, metadata: &CallMetadata) -> GatewayResult<T> {
    serde_json::from_value(arguments).map_err(|e| {
        GatewayError::schema(
            format!("Arguments for {} could not be decoded", metadata.tool_name),
            vec![format!("/: {}", e)],
            metadata,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ToolAnnotations, ToolSchema};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// `details` of every captured entry, keyed by message.
    fn entries(captured: &Captured) -> Vec<(String, Value)> {
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| {
                let entry: Value = serde_json::from_str(line).unwrap();
                let message = entry["fields"]["message"].as_str().unwrap().to_string();
                let details = serde_json::from_str(entry["fields"]["details"].as_str().unwrap()).unwrap();
                (message, details)
            })
            .collect()
    }

    enum Behavior {
        Succeed,
        Refuse,
        Break,
    }

    struct Scripted(Behavior);

    #[async_trait::async_trait]
    impl Tool for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn purpose(&self) -> &'static str {
            "run the script"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "scripted".to_string(),
                description: String::new(),
                input_schema: json!({ "type": "object" }),
                annotations: ToolAnnotations::read_only(),
            }
        }

        async fn handle(&self, _arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
            match self.0 {
                Behavior::Succeed => Ok(Envelope::Success("done".to_string())),
                Behavior::Refuse => Ok(Envelope::failure("Issue X-1 was not found.")),
                Behavior::Break => Err(GatewayError::upstream(
                    "Request to https://acme.test/secret-path failed: connection reset",
                    Some(502),
                    metadata,
                )),
            }
        }
    }

    #[tokio::test]
    async fn test_success_is_unflagged() {
        let result = invoke(&Scripted(Behavior::Succeed), json!({})).await;
        assert!(!result.is_error);
        assert_eq!(result.text_content(), "done");
    }

    #[tokio::test]
    async fn test_expected_failure_is_shown_verbatim() {
        let result = invoke(&Scripted(Behavior::Refuse), json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.text_content(), "Error: Issue X-1 was not found.");
    }

    #[tokio::test]
    async fn test_unexpected_error_is_generic() {
        let result = invoke(&Scripted(Behavior::Break), json!({})).await;
        assert!(result.is_error);

        let text = result.text_content();
        assert_eq!(text, "Error: Failed to run the script. Please try again later.");
        assert!(!text.contains("acme.test"));
        assert!(!text.contains("502"));
    }

    #[tokio::test]
    async fn test_every_invocation_entry_has_a_duration() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(captured.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        invoke(&Scripted(Behavior::Succeed), json!({})).await;
        invoke(&Scripted(Behavior::Break), json!({})).await;

        let entries = entries(&captured);
        let started: Vec<_> = entries.iter().filter(|(m, _)| m == "Tool invocation started").collect();
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|(_, details)| details["duration_ms"] == 0));
        assert!(entries.iter().all(|(_, details)| details["duration_ms"].is_u64()));
    }

    #[test]
    fn test_decode_arguments_reports_schema_error() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Args {
            count: u8,
        }

        let metadata = CallMetadata::new("scripted", "scripted");
        let err = decode_arguments::<Args>(json!({ "count": 999 }), &metadata).unwrap_err();
        assert_eq!(err.kind(), "schema");
        assert_eq!(err.metadata(), &metadata);
    }
}
