// MCP tool definitions and the registry that dispatches to them

use super::pipeline;
use crate::protocol::{CallToolResult, ToolSchema};
use jsonschema::Validator;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use taskbridge_core::{logging, validation, CallMetadata, Envelope, GatewayError, GatewayResult};
use thiserror::Error;

/// Longest tool name accepted by the registry.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name advertised to clients
    fn name(&self) -> &'static str;

    /// Operation recorded in call metadata
    fn operation(&self) -> &'static str {
        self.name()
    }

    /// What the tool does, phrased to follow "Failed to", e.g. "retrieve the issue"
    fn purpose(&self) -> &'static str;

    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Run the domain call and format its result.
    ///
    /// `Ok(Envelope::Failure)` is an expected outcome whose message is shown
    /// as-is; `Err` is unexpected and is replaced by [`Tool::failure_message`].
    async fn handle(&self, arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>>;

    /// Caller-facing text for an unexpected failure. Must not leak upstream detail.
    fn failure_message(&self, _error: &GatewayError) -> String {
        generic_failure(self.purpose())
    }
}

/// The message shown for any failure the caller cannot act on.
pub fn generic_failure(purpose: &str) -> String {
    format!("Failed to {}. Please try again later.", purpose)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    Duplicate(String),

    #[error("Invalid tool name '{0}': use 1-64 letters, digits, '_' or '-'")]
    InvalidName(String),

    #[error("Tool '{name}' has an invalid input schema: {reason}")]
    InvalidSchema { name: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

struct Registered {
    tool: Arc<dyn Tool>,
    schema: ToolSchema,
    arguments: Validator,
}

/// Tool registry for managing available tools.
///
/// Registration is append-only and keeps insertion order for listing.
pub struct ToolRegistry {
    tools: Vec<Registered>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool, compiling its input schema up front.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let schema = tool.schema();
        let name = schema.name.clone();

        if !is_valid_name(&name) || name != tool.name() {
            return Err(RegistryError::InvalidName(name));
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }

        let arguments = validation::compile(&schema.input_schema)
            .map_err(|reason| RegistryError::InvalidSchema {
                name: name.clone(),
                reason,
            })?;

        self.index.insert(name, self.tools.len());
        self.tools.push(Registered {
            tool,
            schema,
            arguments,
        });
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.entry(name).map(|entry| entry.tool.clone())
    }

    /// List all tool schemas in registration order
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|entry| entry.schema.clone()).collect()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check `arguments` against the tool's input schema, then run it.
    ///
    /// Invalid arguments never reach the handler; they come back as a
    /// flagged result listing every problem.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<CallToolResult, RegistryError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;

        let problems = validation::issues(&entry.arguments, &arguments);
        if !problems.is_empty() {
            let metadata = CallMetadata::new(name, entry.tool.operation());
            logging::warn(
                "Rejected tool arguments",
                &metadata,
                json!({ "issues": problems }),
            );
            return Ok(CallToolResult::failure(format!(
                "Invalid arguments for {}: {}",
                name,
                problems.join("; ")
            )));
        }

        Ok(pipeline::invoke(entry.tool.as_ref(), arguments).await)
    }

    fn entry(&self, name: &str) -> Option<&Registered> {
        self.index.get(name).map(|&i| &self.tools[i])
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TOOL_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// Helper functions for creating tool schemas

/// Closed object schema: unknown properties are rejected.
pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

pub fn json_schema_string(description: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": description
    })
}

pub fn json_schema_pattern(description: &str, pattern: &str) -> Value {
    json!({
        "type": "string",
        "pattern": pattern,
        "description": description
    })
}

pub fn json_schema_integer(description: &str, minimum: i64, maximum: i64) -> Value {
    json!({
        "type": "integer",
        "minimum": minimum,
        "maximum": maximum,
        "description": description
    })
}

pub fn json_schema_array(items: Value, description: &str) -> Value {
    json!({
        "type": "array",
        "items": items,
        "description": description
    })
}
