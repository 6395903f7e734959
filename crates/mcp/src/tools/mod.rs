pub mod issues;
pub mod pipeline;
pub mod project;
mod registry;

pub use issues::{CreateIssueTool, GetIssueTool, SearchIssuesTool, UpdateIssueTool};
pub use project::GetProjectConfigTool;
pub use registry::{
    generic_failure, json_schema_array, json_schema_integer, json_schema_object,
    json_schema_pattern, json_schema_string, RegistryError, Tool, ToolRegistry, MAX_TOOL_NAME_LEN,
};

use crate::jira::JiraClient;
use crate::project_config::ProjectConfigStore;
use std::sync::Arc;

/// Registry holding every built-in tool, in listing order.
pub fn default_registry(
    jira: Arc<JiraClient>,
    configs: Arc<ProjectConfigStore>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(GetIssueTool::new(jira.clone())))?;
    registry.register(Arc::new(SearchIssuesTool::new(jira.clone())))?;
    registry.register(Arc::new(CreateIssueTool::new(jira.clone())))?;
    registry.register(Arc::new(UpdateIssueTool::new(jira)))?;
    registry.register(Arc::new(GetProjectConfigTool::new(configs)))?;
    Ok(registry)
}
