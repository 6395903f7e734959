// Per-project configuration blobs kept in the object store

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::{Arc, LazyLock};
use taskbridge_core::storage::BlobStore;
use taskbridge_core::validation::{self, Contract};
use taskbridge_core::{CallMetadata, Envelope, GatewayError, GatewayResult};

/// Validated project configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub project_key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_issue_type: Option<String>,
    #[serde(default)]
    pub default_assignee: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

static PROJECT_CONFIG_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    let schema = json!({
        "type": "object",
        "required": ["projectKey"],
        "properties": {
            "projectKey": { "type": "string", "minLength": 1 },
            "displayName": { "type": "string" },
            "defaultIssueType": { "type": "string" },
            "defaultAssignee": { "type": "string" },
            "labels": strings,
            "components": strings,
            "settings": { "type": "object" }
        }
    });
    validation::compile(&schema).expect("project config schema compiles")
});

impl Contract for ProjectConfig {
    const NAME: &'static str = "project configuration";

    fn validator() -> &'static Validator {
        &PROJECT_CONFIG_VALIDATOR
    }
}

/// Object key of a project's configuration, relative to the store prefix.
pub fn config_key(project_id: &str) -> String {
    format!("{}/config.json", project_id.to_ascii_lowercase())
}

/// Domain client for configuration blobs.
pub struct ProjectConfigStore {
    blobs: Arc<dyn BlobStore>,
}

impl ProjectConfigStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Fetch the raw configuration of `project_id`. A missing blob is a
    /// `Failure`; store faults and unparseable JSON are raised.
    pub async fn fetch(&self, project_id: &str, metadata: &CallMetadata) -> GatewayResult<Envelope<Value>> {
        let key = config_key(project_id);

        let Some(bytes) = self.blobs.get(&key, metadata).await? else {
            return Ok(Envelope::failure(format!(
                "No configuration found for project {}.",
                project_id
            )));
        };

        serde_json::from_slice(&bytes)
            .map(Envelope::Success)
            .map_err(|e| {
                GatewayError::upstream(
                    format!("Configuration blob '{}' is not valid JSON: {}", key, e),
                    None,
                    metadata,
                )
            })
    }
}
