// Issue tracker entities and their response contracts

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::LazyLock;
use taskbridge_core::validation::{self, Contract};

/// Atlassian Document Format node.
///
/// Node types are kept as strings so that types introduced upstream still
/// deserialize; the formatter decides what each type means.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdfNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Vec<AdfNode>,
    #[serde(default)]
    pub attrs: Option<Value>,
}

impl AdfNode {
    /// String attribute, if present.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name)?.as_str()
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attrs.as_ref()?.get(name)?.as_u64()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedValue {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssueFields {
    pub summary: String,
    pub status: NamedValue,
    #[serde(default)]
    pub priority: Option<NamedValue>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default, rename = "issuetype")]
    pub issue_type: Option<NamedValue>,
    #[serde(default)]
    pub description: Option<AdfNode>,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    pub fields: IssueFields,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub is_last: Option<bool>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Whether a search page holds every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Complete,
    Truncated { total: Option<u64> },
    /// Upstream gave no signal either way.
    Unknown,
}

impl SearchPage {
    pub fn pagination(&self) -> Pagination {
        let shown = self.issues.len() as u64;

        if self.is_last == Some(false) || self.next_page_token.is_some() {
            return Pagination::Truncated { total: self.total };
        }
        match (self.total, self.is_last) {
            (Some(total), _) if total > shown => Pagination::Truncated { total: Some(total) },
            (Some(_), _) | (None, Some(true)) => Pagination::Complete,
            (None, _) => Pagination::Unknown,
        }
    }
}

/// Identifier pair returned when an issue is created.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
}

fn adf_node_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": { "type": "string" },
            "text": { "type": "string" },
            "content": { "type": "array", "items": { "$ref": "#/$defs/adfNode" } },
            "attrs": { "type": "object" }
        }
    })
}

fn named_value_schema() -> Value {
    json!({
        "type": ["object", "null"],
        "required": ["name"],
        "properties": { "name": { "type": "string" } }
    })
}

fn user_schema() -> Value {
    json!({
        "type": ["object", "null"],
        "required": ["displayName"],
        "properties": { "displayName": { "type": "string" } }
    })
}

fn issue_schema() -> Value {
    json!({
        "type": "object",
        "required": ["key", "fields"],
        "properties": {
            "id": { "type": "string" },
            "key": { "type": "string", "minLength": 1 },
            "fields": {
                "type": "object",
                "required": ["summary", "status", "created", "updated"],
                "properties": {
                    "summary": { "type": "string" },
                    "status": {
                        "type": "object",
                        "required": ["name"],
                        "properties": { "name": { "type": "string" } }
                    },
                    "priority": named_value_schema(),
                    "issuetype": named_value_schema(),
                    "assignee": user_schema(),
                    "reporter": user_schema(),
                    "description": {
                        "anyOf": [{ "type": "null" }, { "$ref": "#/$defs/adfNode" }]
                    },
                    "created": { "type": "string" },
                    "updated": { "type": "string" }
                }
            }
        }
    })
}

/// Attach the shared definitions to a root schema.
fn with_defs(mut schema: Value) -> Value {
    schema["$defs"] = json!({ "adfNode": adf_node_schema() });
    schema
}

static ISSUE_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    validation::compile(&with_defs(issue_schema())).expect("issue schema compiles")
});

static SEARCH_PAGE_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema = json!({
        "type": "object",
        "required": ["issues"],
        "properties": {
            "issues": { "type": "array", "items": issue_schema() },
            "total": { "type": "integer", "minimum": 0 },
            "isLast": { "type": "boolean" },
            "nextPageToken": { "type": "string" }
        }
    });
    validation::compile(&with_defs(schema)).expect("search page schema compiles")
});

static CREATED_ISSUE_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema = json!({
        "type": "object",
        "required": ["id", "key"],
        "properties": {
            "id": { "type": "string" },
            "key": { "type": "string", "minLength": 1 },
            "self": { "type": "string" }
        }
    });
    validation::compile(&schema).expect("created issue schema compiles")
});

impl Contract for Issue {
    const NAME: &'static str = "issue";

    fn validator() -> &'static Validator {
        &ISSUE_VALIDATOR
    }
}

impl Contract for SearchPage {
    const NAME: &'static str = "search result page";

    fn validator() -> &'static Validator {
        &SEARCH_PAGE_VALIDATOR
    }
}

impl Contract for CreatedIssue {
    const NAME: &'static str = "created issue";

    fn validator() -> &'static Validator {
        &CREATED_ISSUE_VALIDATOR
    }
}
