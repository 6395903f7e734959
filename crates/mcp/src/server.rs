// MCP server: JSON-RPC 2.0 over newline-delimited stdio

use crate::context::ServerContext;
use crate::protocol::*;
use crate::tools::RegistryError;
use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::io;
use taskbridge_core::{logging, CallMetadata};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

pub const SERVER_NAME: &str = "taskbridge-mcp";

/// Longest accepted request line, in bytes.
pub const MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

/// Responses waiting for the stdout writer.
const OUTBOUND_BUFFER: usize = 64;

/// One inbound line, or the reason it could not be read.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line(String),
    NotUtf8,
    TooLong,
}

/// Line decoder that reports malformed lines as frames.
///
/// `FramedRead` ends the stream after a decode error, so only I/O
/// failures are surfaced as errors here.
struct RequestLines(LinesCodec);

impl RequestLines {
    fn new(max_length: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_length))
    }

    fn frame(decoded: Result<Option<String>, LinesCodecError>) -> Result<Option<Frame>, LinesCodecError> {
        match decoded {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::TooLong)),
            Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => Ok(Some(Frame::NotUtf8)),
            Err(e) => Err(e),
        }
    }
}

impl Decoder for RequestLines {
    type Item = Frame;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        Self::frame(self.0.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, LinesCodecError> {
        Self::frame(self.0.decode_eof(buf))
    }
}

#[derive(Clone)]
pub struct McpServer {
    context: ServerContext,
    max_line_length: usize,
}

impl McpServer {
    pub fn new(context: ServerContext) -> Self {
        Self {
            context,
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Serve requests from stdin until it closes.
    pub async fn start(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited requests from `reader`, answering on `writer`.
    ///
    /// Each line is handled on its own task and one writer task owns the
    /// output. A line that is not UTF-8 or is too long gets an error reply
    /// and reading continues. Only an I/O failure on `reader` ends the loop
    /// early. In-flight requests are answered before returning.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let metadata = CallMetadata::server("serve");
        logging::info(
            "MCP server listening",
            &metadata,
            json!({ "tools": self.context.registry.len() }),
        );

        let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

        let writer = tokio::spawn(async move {
            let mut sink = FramedWrite::new(writer, LinesCodec::new());
            while let Some(line) = rx.recv().await {
                sink.send(line).await.context("Failed to write response")?;
            }
            Ok::<_, anyhow::Error>(())
        });

        let mut frames = FramedRead::new(reader, RequestLines::new(self.max_line_length));
        let mut read_error = None;
        while let Some(frame) = frames.next().await {
            let line = match frame {
                Ok(Frame::Line(line)) => line,
                Ok(Frame::NotUtf8) => {
                    reject(&tx, "Request line is not valid UTF-8", JsonRpcError::parse_error()).await;
                    continue;
                }
                Ok(Frame::TooLong) => {
                    reject(&tx, "Request line exceeds the length limit", JsonRpcError::invalid_request()).await;
                    continue;
                }
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(response) = server.dispatch(&line).await else {
                    return;
                };
                send(&tx, &response).await;
            });
        }

        // Input closed: let in-flight requests finish, then stop the writer.
        drop(tx);
        writer.await.context("Response writer task failed")??;

        if let Some(e) = read_error {
            return Err(e).context("Failed to read requests");
        }
        logging::info("MCP server stopped", &metadata, json!({}));
        Ok(())
    }

    /// Handle one line, turning a panicked handler into an internal error.
    async fn dispatch(&self, line: &str) -> Option<JsonRpcResponse> {
        let id = serde_json::from_str::<Value>(line)
            .ok()
            .and_then(|v| v.get("id").cloned())
            .unwrap_or(Value::Null);

        let server = self.clone();
        let owned = line.to_string();
        match tokio::spawn(async move { server.handle_message(&owned).await }).await {
            Ok(response) => response,
            Err(e) => {
                logging::error(
                    "Request handler aborted",
                    &CallMetadata::server("dispatch"),
                    json!({ "error": e.to_string() }),
                );
                Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::internal_error("Internal error"),
                ))
            }
        }
    }

    /// Handle a single JSON-RPC message. Notifications yield `None`.
    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(_) => {
                return Some(match serde_json::from_str::<Value>(message) {
                    // Valid JSON but not a request object
                    Ok(value) => JsonRpcResponse::error(
                        value.get("id").cloned().unwrap_or(Value::Null),
                        JsonRpcError::invalid_request(),
                    ),
                    Err(_) => JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()),
                });
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request(),
            ));
        }

        if request.is_notification() {
            if request.method != "notifications/initialized" {
                tracing::debug!(method = %request.method, "Ignoring notification");
            }
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params)
                .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            logging::info(
                "Client connected",
                &CallMetadata::server("initialize"),
                json!({
                    "client": client.name,
                    "client_version": client.version,
                    "protocol_version": params.protocol_version,
                }),
            );
        }

        to_result(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        })
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        to_result(ListToolsResult {
            tools: self.context.registry.list_schemas(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tools/call params"))
            .and_then(|params| {
                serde_json::from_value(params)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))
            })?;

        match self.context.registry.call(&params.name, params.arguments).await {
            Ok(result) => to_result(result),
            Err(e @ RegistryError::UnknownTool(_)) => Err(JsonRpcError::invalid_params(e.to_string())),
            Err(e) => Err(JsonRpcError::internal_error(e.to_string())),
        }
    }
}

fn to_result(value: impl serde::Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::internal_error(format!("Serialization error: {}", e)))
}

/// Queue one response for the writer task.
async fn send(tx: &mpsc::Sender<String>, response: &JsonRpcResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            // The writer only stops once every sender is gone
            let _ = tx.send(line).await;
        }
        Err(e) => logging::error(
            "Failed to serialize response",
            &CallMetadata::server("dispatch"),
            json!({ "error": e.to_string() }),
        ),
    }
}

/// Answer an unreadable line. Its id is unknown, so the reply carries null.
async fn reject(tx: &mpsc::Sender<String>, reason: &str, error: JsonRpcError) {
    logging::warn(reason, &CallMetadata::server("read"), json!({ "code": error.code }));
    send(tx, &JsonRpcResponse::error(Value::Null, error)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{json_schema_object, json_schema_string, Tool, ToolRegistry};
    use std::sync::Arc;
    use std::time::Duration;
    use taskbridge_core::{
        Envelope, GatewayResult, JiraSettings, Secret, Settings, StoreSettings,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use url::Url;

    struct Greeter;

    #[async_trait::async_trait]
    impl Tool for Greeter {
        fn name(&self) -> &'static str {
            "greet"
        }

        fn purpose(&self) -> &'static str {
            "greet"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "greet".to_string(),
                description: "Say hello".to_string(),
                input_schema: json_schema_object(json!({ "name": json_schema_string("Who") }), vec!["name"]),
                annotations: ToolAnnotations::read_only(),
            }
        }

        async fn handle(&self, arguments: Value, _metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
            Ok(Envelope::Success(format!("Hello, {}", arguments["name"].as_str().unwrap_or("?"))))
        }
    }

    fn settings() -> Settings {
        Settings {
            jira: JiraSettings {
                base_url: Url::parse("https://acme.atlassian.net").unwrap(),
                email: "bot@acme.test".to_string(),
                api_token: Secret::new("tok"),
            },
            store: StoreSettings {
                region: "us-east-1".to_string(),
                bucket: "configs".to_string(),
                access_key_id: Secret::new("AKIA"),
                secret_access_key: Secret::new("shh"),
                endpoint: None,
                prefix: "projects".to_string(),
            },
            upstream_timeout: Duration::from_secs(30),
        }
    }

    fn server() -> McpServer {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Greeter)).unwrap();
        McpServer::new(ServerContext::new(Arc::new(settings()), registry))
    }

    async fn roundtrip(message: Value) -> Value {
        let response = server().handle_message(&message.to_string()).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = roundtrip(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2024-11-05", "clientInfo": { "name": "test", "version": "1" } }
        }))
        .await;

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(response["result"]["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_notification_gets_no_reply() {
        let message = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        assert!(server().handle_message(&message.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_list_and_call() {
        let listed = roundtrip(json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" })).await;
        assert_eq!(listed["result"]["tools"][0]["name"], "greet");
        assert_eq!(listed["result"]["tools"][0]["annotations"]["readOnlyHint"], true);

        let called = roundtrip(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": "greet", "arguments": { "name": "Ada" } }
        }))
        .await;
        assert_eq!(called["result"]["isError"], false);
        assert_eq!(called["result"]["content"][0]["text"], "Hello, Ada");
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_a_flagged_result() {
        let called = roundtrip(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "greet" }
        }))
        .await;
        assert!(called.get("error").is_none());
        assert_eq!(called["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let unknown_tool = roundtrip(json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": { "name": "nope" }
        }))
        .await;
        assert_eq!(unknown_tool["error"]["code"], -32602);

        let unknown_method = roundtrip(json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" })).await;
        assert_eq!(unknown_method["error"]["code"], -32601);

        let wrong_version = roundtrip(json!({ "jsonrpc": "1.0", "id": 6, "method": "ping" })).await;
        assert_eq!(wrong_version["error"]["code"], -32600);

        let not_a_request = roundtrip(json!([1, 2, 3])).await;
        assert_eq!(not_a_request["error"]["code"], -32600);

        let garbage = server().handle_message("{not json").await.unwrap();
        assert_eq!(garbage.error.unwrap().code, -32700);
        assert_eq!(garbage.id, Value::Null);
    }

    #[tokio::test]
    async fn test_ping() {
        let pong = roundtrip(json!({ "jsonrpc": "2.0", "id": 7, "method": "ping" })).await;
        assert_eq!(pong["result"], json!({}));
    }

    #[tokio::test]
    async fn test_null_id_is_a_request() {
        let pong = roundtrip(json!({ "jsonrpc": "2.0", "id": null, "method": "ping" })).await;
        assert_eq!(pong["id"], Value::Null);
        assert_eq!(pong["result"], json!({}));
    }

    /// Feed `input` through `serve` and collect every reply line.
    async fn serve_bytes(server: McpServer, input: &[u8]) -> Vec<Value> {
        let (mut client, requests) = tokio::io::duplex(1024);
        let (replies, mut output) = tokio::io::duplex(64 * 1024);
        let serving = tokio::spawn(async move { server.serve(requests, replies).await });

        client.write_all(input).await.unwrap();
        drop(client);
        serving.await.unwrap().unwrap();

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        text.lines().map(|line| serde_json::from_str(line).unwrap()).collect()
    }

    fn reply_with_id<'a>(replies: &'a [Value], id: &Value) -> &'a Value {
        replies
            .iter()
            .find(|reply| &reply["id"] == id && reply.get("result").is_some())
            .unwrap_or_else(|| panic!("no reply for id {}", id))
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_the_server() {
        let replies = serve_bytes(
            server(),
            b"\xff\xfe\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        )
        .await;

        assert_eq!(replies.len(), 2);
        let rejected: Vec<_> = replies.iter().filter(|r| r.get("error").is_some()).collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0]["error"]["code"], -32700);
        assert_eq!(rejected[0]["id"], Value::Null);
        assert_eq!(reply_with_id(&replies, &json!(2))["result"], json!({}));
    }

    #[tokio::test]
    async fn test_overlong_line_is_rejected_and_skipped() {
        let long = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "ping",
            "params": { "pad": "x".repeat(4096) }
        });
        let input = format!(
            "{}\n\n{}\n",
            long,
            json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" })
        );

        let replies = serve_bytes(server().with_max_line_length(256), input.as_bytes()).await;

        assert_eq!(replies.len(), 2);
        let rejected = replies.iter().find(|r| r.get("error").is_some()).unwrap();
        assert_eq!(rejected["error"]["code"], -32600);
        assert_eq!(rejected["id"], Value::Null);
        assert_eq!(reply_with_id(&replies, &json!(3))["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_answers_every_request_before_returning() {
        let input: String = (0..20)
            .map(|id| format!("{}\n", json!({ "jsonrpc": "2.0", "id": id, "method": "ping" })))
            .collect();

        let replies = serve_bytes(server(), input.as_bytes()).await;

        assert_eq!(replies.len(), 20);
        for id in 0..20 {
            reply_with_id(&replies, &json!(id));
        }
    }
}
