// Issue tracker tools

use super::pipeline::decode_arguments;
use crate::format::{adf, format_created_issue, format_issue, format_issue_updated, format_search_page};
use crate::jira::{CreatedIssue, Issue, JiraClient, NewIssue, SearchPage};
use crate::protocol::{ToolAnnotations, ToolSchema};
use crate::tools::{
    generic_failure, json_schema_integer, json_schema_object, json_schema_pattern,
    json_schema_string, Tool,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use taskbridge_core::validation::validate_as;
use taskbridge_core::{CallMetadata, Envelope, GatewayError, GatewayResult};

pub const ISSUE_KEY_PATTERN: &str = "^[A-Z][A-Z0-9_]+-[1-9][0-9]*$";
pub const PROJECT_KEY_PATTERN: &str = "^[A-Z][A-Z0-9_]+$";

pub const DEFAULT_MAX_RESULTS: u32 = 20;
pub const MAX_RESULTS_LIMIT: u32 = 100;
pub const DEFAULT_ISSUE_TYPE: &str = "Task";

const SEARCH_REJECTED: &str =
    "The issue tracker rejected the search query. Check the JQL syntax and try again.";
const CREATE_REJECTED: &str =
    "The issue tracker rejected the new issue. Check the project key, issue type and summary.";
const UPDATE_REJECTED: &str =
    "The issue tracker rejected the update. Check the field names and values.";

/// Specific text for a 400 reply, generic text otherwise.
fn bad_request_or_generic(tool: &dyn Tool, error: &GatewayError, rejected: &str) -> String {
    match error.status() {
        Some(400) => rejected.to_string(),
        _ => generic_failure(tool.purpose()),
    }
}

/// Tool to read a single issue
pub struct GetIssueTool {
    jira: Arc<JiraClient>,
}

impl GetIssueTool {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

#[derive(Debug, Deserialize)]
struct GetIssueArgs {
    issue_key: String,
}

#[async_trait::async_trait]
impl Tool for GetIssueTool {
    fn name(&self) -> &'static str {
        "get_issue"
    }

    fn purpose(&self) -> &'static str {
        "retrieve the issue"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: "Get one issue by key, including status, people, dates and the description as plain text."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "issue_key": json_schema_pattern("Issue key, e.g. PROJ-123", ISSUE_KEY_PATTERN)
                }),
                vec!["issue_key"],
            ),
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn handle(&self, arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
        let args: GetIssueArgs = decode_arguments(arguments, metadata)?;

        self.jira
            .get_issue(&args.issue_key, metadata)
            .await?
            .try_map(|payload| {
                let issue: Issue = validate_as(payload, metadata)?;
                Ok(format_issue(&issue))
            })
    }
}

/// Tool to search issues with JQL
pub struct SearchIssuesTool {
    jira: Arc<JiraClient>,
}

impl SearchIssuesTool {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

#[derive(Debug, Deserialize)]
struct SearchIssuesArgs {
    jql: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

#[async_trait::async_trait]
impl Tool for SearchIssuesTool {
    fn name(&self) -> &'static str {
        "search_issues"
    }

    fn purpose(&self) -> &'static str {
        "search issues"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: format!(
                "Search issues with a JQL query. Returns one line per issue, at most {} per call.",
                MAX_RESULTS_LIMIT
            ),
            input_schema: json_schema_object(
                json!({
                    "jql": json_schema_string("JQL query, e.g. project = PROJ AND status = \"In Progress\""),
                    "max_results": json_schema_integer(
                        &format!("Maximum number of issues to return (default: {})", DEFAULT_MAX_RESULTS),
                        1,
                        MAX_RESULTS_LIMIT as i64,
                    )
                }),
                vec!["jql"],
            ),
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn handle(&self, arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
        let args: SearchIssuesArgs = decode_arguments(arguments, metadata)?;

        self.jira
            .search(&args.jql, args.max_results, metadata)
            .await?
            .try_map(|payload| {
                let page: SearchPage = validate_as(payload, metadata)?;
                Ok(format_search_page(&page))
            })
    }

    fn failure_message(&self, error: &GatewayError) -> String {
        bad_request_or_generic(self, error, SEARCH_REJECTED)
    }
}

/// Tool to create an issue
pub struct CreateIssueTool {
    jira: Arc<JiraClient>,
}

impl CreateIssueTool {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    project_key: String,
    summary: String,
    #[serde(default = "default_issue_type")]
    issue_type: String,
    #[serde(default)]
    description: Option<String>,
}

fn default_issue_type() -> String {
    DEFAULT_ISSUE_TYPE.to_string()
}

#[async_trait::async_trait]
impl Tool for CreateIssueTool {
    fn name(&self) -> &'static str {
        "create_issue"
    }

    fn purpose(&self) -> &'static str {
        "create the issue"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: "Create an issue in a project. The description is plain text; blank lines separate paragraphs."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "project_key": json_schema_pattern("Project key, e.g. PROJ", PROJECT_KEY_PATTERN),
                    "summary": json_schema_string("One-line summary"),
                    "issue_type": json_schema_string(&format!("Issue type name (default: {})", DEFAULT_ISSUE_TYPE)),
                    "description": { "type": "string", "description": "Plain-text description" }
                }),
                vec!["project_key", "summary"],
            ),
            annotations: ToolAnnotations {
                read_only_hint: false,
                destructive_hint: false,
                idempotent_hint: false,
                open_world_hint: true,
            },
        }
    }

    async fn handle(&self, arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
        let args: CreateIssueArgs = decode_arguments(arguments, metadata)?;
        let issue = NewIssue {
            project_key: args.project_key,
            summary: args.summary,
            issue_type: args.issue_type,
            description: args
                .description
                .filter(|text| !text.trim().is_empty())
                .map(|text| adf::from_plain_text(&text)),
        };

        self.jira
            .create_issue(&issue, metadata)
            .await?
            .try_map(|payload| {
                let created: CreatedIssue = validate_as(payload, metadata)?;
                Ok(format_created_issue(&created, &self.jira.browse_url(&created.key)))
            })
    }

    fn failure_message(&self, error: &GatewayError) -> String {
        bad_request_or_generic(self, error, CREATE_REJECTED)
    }
}

/// Tool to update fields of an issue
pub struct UpdateIssueTool {
    jira: Arc<JiraClient>,
}

impl UpdateIssueTool {
    pub fn new(jira: Arc<JiraClient>) -> Self {
        Self { jira }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateIssueArgs {
    issue_key: String,
    fields: Map<String, Value>,
}

#[async_trait::async_trait]
impl Tool for UpdateIssueTool {
    fn name(&self) -> &'static str {
        "update_issue"
    }

    fn purpose(&self) -> &'static str {
        "update the issue"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: "Update fields of an issue. Field values use the issue tracker's REST representation, e.g. {\"summary\": \"New title\"}."
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "issue_key": json_schema_pattern("Issue key, e.g. PROJ-123", ISSUE_KEY_PATTERN),
                    "fields": {
                        "type": "object",
                        "minProperties": 1,
                        "description": "Field names mapped to their new values"
                    }
                }),
                vec!["issue_key", "fields"],
            ),
            annotations: ToolAnnotations {
                read_only_hint: false,
                destructive_hint: true,
                idempotent_hint: true,
                open_world_hint: true,
            },
        }
    }

    async fn handle(&self, arguments: Value, metadata: &CallMetadata) -> GatewayResult<Envelope<String>> {
        let args: UpdateIssueArgs = decode_arguments(arguments, metadata)?;

        // 204 carries no body, so there is nothing to validate on success.
        let outcome = self.jira.update_issue(&args.issue_key, &args.fields, metadata).await?;
        Ok(outcome.map(|_| {
            let mut changed: Vec<&str> = args.fields.keys().map(String::as_str).collect();
            changed.sort_unstable();
            format_issue_updated(&args.issue_key, &changed)
        }))
    }

    fn failure_message(&self, error: &GatewayError) -> String {
        bad_request_or_generic(self, error, UPDATE_REJECTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskbridge_core::validation;

    fn accepts(tool: &dyn Tool, arguments: Value) -> bool {
        let validator = validation::compile(&tool.schema().input_schema).unwrap();
        validation::issues(&validator, &arguments).is_empty()
    }

    fn client() -> Arc<JiraClient> {
        let settings = taskbridge_core::JiraSettings {
            base_url: url::Url::parse("https://acme.atlassian.net").unwrap(),
            email: "bot@acme.test".to_string(),
            api_token: taskbridge_core::Secret::new("tok"),
        };
        let meta = CallMetadata::server("test");
        let http = taskbridge_core::HttpClient::new(&meta).unwrap();
        Arc::new(JiraClient::new(&settings, http, taskbridge_core::http::DEFAULT_TIMEOUT, &meta).unwrap())
    }

    #[test]
    fn test_issue_key_contract() {
        let tool = GetIssueTool::new(client());
        assert!(accepts(&tool, json!({ "issue_key": "PROJ-123" })));
        assert!(accepts(&tool, json!({ "issue_key": "AB_2-7" })));
        assert!(!accepts(&tool, json!({ "issue_key": "proj-1" })));
        assert!(!accepts(&tool, json!({ "issue_key": "PROJ-0" })));
        assert!(!accepts(&tool, json!({ "issue_key": "PROJ-1/../../admin" })));
        assert!(!accepts(&tool, json!({})));
    }

    #[test]
    fn test_search_contract() {
        let tool = SearchIssuesTool::new(client());
        assert!(accepts(&tool, json!({ "jql": "project = PROJ" })));
        assert!(accepts(&tool, json!({ "jql": "project = PROJ", "max_results": 100 })));
        assert!(!accepts(&tool, json!({ "jql": "" })));
        assert!(!accepts(&tool, json!({ "jql": "x", "max_results": 0 })));
        assert!(!accepts(&tool, json!({ "jql": "x", "max_results": 101 })));
        assert!(!accepts(&tool, json!({ "jql": "x", "max_results": 2.5 })));
    }

    #[test]
    fn test_update_requires_fields() {
        let tool = UpdateIssueTool::new(client());
        assert!(accepts(&tool, json!({ "issue_key": "PROJ-1", "fields": { "summary": "x" } })));
        assert!(!accepts(&tool, json!({ "issue_key": "PROJ-1", "fields": {} })));
    }

    #[test]
    fn test_bad_request_message_is_specific_and_safe() {
        let meta = CallMetadata::new("search_issues", "search_issues");
        let tool = SearchIssuesTool::new(client());

        let rejected = GatewayError::upstream("Request to https://acme.atlassian.net/rest/api/3/search/jql returned 400", Some(400), &meta);
        assert_eq!(tool.failure_message(&rejected), SEARCH_REJECTED);

        let outage = GatewayError::upstream("returned 503", Some(503), &meta);
        assert_eq!(
            tool.failure_message(&outage),
            "Failed to search issues. Please try again later."
        );
    }

    #[test]
    fn test_unexpected_failures_share_one_message() {
        let meta = CallMetadata::new("any", "any");
        let outage = GatewayError::upstream("returned 500", Some(500), &meta);
        let jira = client();
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(GetIssueTool::new(jira.clone())),
            Box::new(SearchIssuesTool::new(jira.clone())),
            Box::new(CreateIssueTool::new(jira.clone())),
            Box::new(UpdateIssueTool::new(jira)),
        ];

        for tool in &tools {
            assert_eq!(tool.failure_message(&outage), generic_failure(tool.purpose()));
        }
        assert_eq!(
            tools[0].failure_message(&outage),
            "Failed to retrieve the issue. Please try again later."
        );
    }

    #[test]
    fn test_annotations_match_behavior() {
        let jira = client();
        assert!(GetIssueTool::new(jira.clone()).schema().annotations.read_only_hint);
        assert!(!CreateIssueTool::new(jira.clone()).schema().annotations.idempotent_hint);
        assert!(UpdateIssueTool::new(jira).schema().annotations.destructive_hint);
    }
}
