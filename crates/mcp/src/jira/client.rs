// Authenticated client for the issue tracker REST API

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::time::Duration;
use taskbridge_core::{
    CallMetadata, Envelope, GatewayError, GatewayResult, HttpClient, HttpRequest, HttpResponse,
    JiraSettings,
};
use url::Url;

pub const AUTHENTICATION_FAILED: &str =
    "Authentication with the issue tracker failed. Check the server's Jira credentials.";
pub const PERMISSION_DENIED: &str =
    "Permission denied. The service account is not allowed to perform this operation.";
pub const DEFAULT_NOT_FOUND: &str = "The requested resource was not found in the issue tracker.";

/// Fields requested for every issue returned by a search.
const SEARCH_FIELDS: &[&str] = &[
    "summary", "status", "priority", "assignee", "issuetype", "created", "updated",
];

/// Input for issue creation.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub project_key: String,
    pub summary: String,
    pub issue_type: String,
    /// Rich-text (ADF) description
    pub description: Option<Value>,
}

/// Client for the Jira Cloud REST v3 API.
///
/// Credentials come from [`JiraSettings`] only; nothing supplied by a caller
/// ever reaches the authorization header.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: HttpClient,
    base_url: String,
    authorization: HeaderValue,
    timeout: Duration,
}

impl JiraClient {
    pub fn new(
        settings: &JiraSettings,
        http: HttpClient,
        timeout: Duration,
        metadata: &CallMetadata,
    ) -> GatewayResult<Self> {
        let credentials = STANDARD.encode(format!("{}:{}", settings.email, settings.api_token.expose()));
        let mut authorization = HeaderValue::from_str(&format!("Basic {}", credentials)).map_err(|_| {
            GatewayError::config("Jira credentials cannot be encoded as a header", metadata)
        })?;
        authorization.set_sensitive(true);

        Ok(Self {
            http,
            base_url: settings.base_url.as_str().trim_end_matches('/').to_string(),
            authorization,
            timeout,
        })
    }

    /// Human-facing link to an issue.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    /// Send one authenticated request and classify the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        not_found_message: Option<&str>,
        metadata: &CallMetadata,
    ) -> GatewayResult<Envelope<Value>> {
        let url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|_| {
            GatewayError::upstream(format!("Invalid issue tracker path: {}", path), None, metadata)
        })?;

        let has_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
        let mut request = HttpRequest::new(method, url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .timeout(self.timeout);
        if has_body {
            request = request.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = self.http.send(request, metadata).await?;
        classify_response(response, not_found_message, metadata)
    }

    pub async fn get_issue(&self, key: &str, metadata: &CallMetadata) -> GatewayResult<Envelope<Value>> {
        let not_found = format!("Issue {} was not found.", key);
        self.request(
            Method::GET,
            &format!("/rest/api/3/issue/{}", key),
            None,
            Some(&not_found),
            metadata,
        )
        .await
    }

    pub async fn search(
        &self,
        jql: &str,
        max_results: u32,
        metadata: &CallMetadata,
    ) -> GatewayResult<Envelope<Value>> {
        let body = json!({
            "jql": jql,
            "maxResults": max_results,
            "fields": SEARCH_FIELDS,
        });
        self.request(Method::POST, "/rest/api/3/search/jql", Some(&body), None, metadata)
            .await
    }

    pub async fn create_issue(&self, issue: &NewIssue, metadata: &CallMetadata) -> GatewayResult<Envelope<Value>> {
        let mut fields = json!({
            "project": { "key": issue.project_key },
            "summary": issue.summary,
            "issuetype": { "name": issue.issue_type },
        });
        if let Some(description) = &issue.description {
            fields["description"] = description.clone();
        }

        let not_found = format!("Project {} was not found.", issue.project_key);
        self.request(
            Method::POST,
            "/rest/api/3/issue",
            Some(&json!({ "fields": fields })),
            Some(&not_found),
            metadata,
        )
        .await
    }

    /// Update fields of an issue. Success carries `Value::Null` (204, no body).
    pub async fn update_issue(
        &self,
        key: &str,
        fields: &Map<String, Value>,
        metadata: &CallMetadata,
    ) -> GatewayResult<Envelope<Value>> {
        let not_found = format!("Issue {} was not found.", key);
        self.request(
            Method::PUT,
            &format!("/rest/api/3/issue/{}", key),
            Some(&json!({ "fields": fields })),
            Some(&not_found),
            metadata,
        )
        .await
    }
}

/// Map a completed exchange onto the envelope contract.
///
/// 401, 403 and 404 are expected outcomes and become `Failure`; any other
/// non-2xx status is raised as an upstream error.
pub fn classify_response(
    response: HttpResponse,
    not_found_message: Option<&str>,
    metadata: &CallMetadata,
) -> GatewayResult<Envelope<Value>> {
    match response.status {
        401 => Ok(Envelope::failure(AUTHENTICATION_FAILED)),
        403 => Ok(Envelope::failure(PERMISSION_DENIED)),
        404 => Ok(Envelope::failure(not_found_message.unwrap_or(DEFAULT_NOT_FOUND))),
        status if !response.is_success() => Err(GatewayError::upstream(
            format!("Issue tracker returned status {}", status),
            Some(status),
            metadata,
        )),
        status => {
            if response.body.trim().is_empty() {
                return Ok(Envelope::Success(Value::Null));
            }
            serde_json::from_str(&response.body)
                .map(Envelope::Success)
                .map_err(|e| {
                    GatewayError::upstream(
                        format!("Issue tracker returned a body that is not valid JSON: {}", e),
                        Some(status),
                        metadata,
                    )
                })
        }
    }
}
