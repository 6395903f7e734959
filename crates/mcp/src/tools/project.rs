// Project configuration tool

use super::pipeline::decode_arguments;
use crate::format::format_project_config;
use crate::project_config::{ProjectConfig, ProjectConfigStore};
use crate::protocol::{ToolAnnotations, ToolSchema};
use crate::tools::{json_schema_object, json_schema_pattern, Tool};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use taskbridge_core::validation::validate_as;
use taskbridge_core::{CallMetadata, Envelope, GatewayResult};

/// Letters, digits, '_' and '-' only, so an id can never escape its prefix.
pub const PROJECT_ID_PATTERN: &str = "^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$";

/// Tool to read the stored configuration of a project
pub struct GetProjectConfigTool {
    configs: Arc<ProjectConfigStore>,
}

impl GetProjectConfigTool {
    pub fn new(configs: Arc<ProjectConfigStore>) -> Self {
        Self { configs }
    }
}

#[derive(Debug, Deserialize)]
struct GetProjectConfigArgs {
    project_id: String,
}

#[async_trait::async_trait]
impl Tool for GetProjectConfigTool {
    fn name(&self) -> &'static str {
        "get_project_config"
    }

    fn purpose(&self) -> &'static str {
        "load the project configuration"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: "Get the stored configuration of a project: defaults for new issues, labels, components and settings."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "project_id": json_schema_pattern("Project identifier, e.g. acme-web", PROJECT_ID_PATTERN)
                }),
                vec!["project_id"],
            ),
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn handle(&self, arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
        let args: GetProjectConfigArgs = decode_arguments(arguments, metadata)?;

        self.configs
            .fetch(&args.project_id, metadata)
            .await?
            .try_map(|payload| {
                let config: ProjectConfig = validate_as(payload, metadata)?;
                Ok(format_project_config(&config))
            })
    }
}
