//! Process settings, loaded once from the environment at startup.

use crate::error::{GatewayError, GatewayResult};
use crate::metadata::CallMetadata;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CONFIG_PREFIX: &str = "projects";

/// A credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Issue tracker connection settings.
#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub base_url: Url,
    pub email: String,
    pub api_token: Secret,
}

/// Object store settings for project configuration blobs.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub region: String,
    pub bucket: String,
    pub access_key_id: Secret,
    pub secret_access_key: Secret,
    /// S3-compatible endpoint override (MinIO etc.)
    pub endpoint: Option<Url>,
    pub prefix: String,
}

impl StoreSettings {
    /// Build the S3 backend described by these settings.
    pub fn build_store(&self, metadata: &CallMetadata) -> GatewayResult<Arc<dyn object_store::ObjectStore>> {
        let mut builder = object_store::aws::AmazonS3Builder::new()
            .with_region(&self.region)
            .with_bucket_name(&self.bucket)
            .with_access_key_id(self.access_key_id.expose())
            .with_secret_access_key(self.secret_access_key.expose());

        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint.as_str().trim_end_matches('/'))
                .with_allow_http(endpoint.scheme() == "http");
        }

        let store = builder.build().map_err(|_| {
            GatewayError::config("Object store settings were rejected by the S3 client", metadata)
        })?;
        Ok(Arc::new(store))
    }
}

/// Validated, immutable process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub jira: JiraSettings,
    pub store: StoreSettings,
    pub upstream_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> GatewayResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`. Every problem is reported at once,
    /// naming the variables but never their values.
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let metadata = CallMetadata::server("load_settings");
        let mut problems = Vec::new();

        let mut required = |name: &'static str| -> Option<String> {
            match lookup(name).map(|v| v.trim().to_string()) {
                Some(value) if !value.is_empty() => Some(value),
                _ => {
                    problems.push(format!("{} is not set", name));
                    None
                }
            }
        };

        let base_url = required("JIRA_BASE_URL");
        let email = required("JIRA_EMAIL");
        let api_token = required("JIRA_API_TOKEN");
        let region = required("AWS_REGION");
        let bucket = required("CONFIG_BUCKET");
        let access_key_id = required("AWS_ACCESS_KEY_ID");
        let secret_access_key = required("AWS_SECRET_ACCESS_KEY");

        let base_url = base_url.and_then(|raw| match parse_http_url(&raw) {
            Some(url) => Some(url),
            None => {
                problems.push("JIRA_BASE_URL must be an http(s) URL".to_string());
                None
            }
        });

        if let Some(email) = &email {
            if !email.contains('@') {
                problems.push("JIRA_EMAIL must be an email address".to_string());
            }
        }

        let endpoint = match optional(&lookup, "AWS_ENDPOINT_URL") {
            Some(raw) => match parse_http_url(&raw) {
                Some(url) => Some(url),
                None => {
                    problems.push("AWS_ENDPOINT_URL must be an http(s) URL".to_string());
                    None
                }
            },
            None => None,
        };

        let prefix = optional(&lookup, "CONFIG_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CONFIG_PREFIX.to_string());

        let timeout_ms = match optional(&lookup, "UPSTREAM_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    problems.push("UPSTREAM_TIMEOUT_MS must be a positive integer".to_string());
                    DEFAULT_TIMEOUT_MS
                }
            },
            None => DEFAULT_TIMEOUT_MS,
        };

        if !problems.is_empty() {
            return Err(GatewayError::config(
                format!("invalid environment: {}", problems.join("; ")),
                &metadata,
            ));
        }

        // Every required value is present once `problems` is empty.
        match (
            base_url,
            email,
            api_token,
            region,
            bucket,
            access_key_id,
            secret_access_key,
        ) {
            (
                Some(base_url),
                Some(email),
                Some(api_token),
                Some(region),
                Some(bucket),
                Some(access_key_id),
                Some(secret_access_key),
            ) => Ok(Self {
                jira: JiraSettings {
                    base_url,
                    email,
                    api_token: Secret::new(api_token),
                },
                store: StoreSettings {
                    region,
                    bucket,
                    access_key_id: Secret::new(access_key_id),
                    secret_access_key: Secret::new(secret_access_key),
                    endpoint,
                    prefix,
                },
                upstream_timeout: Duration::from_millis(timeout_ms),
            }),
            _ => Err(GatewayError::config("invalid environment", &metadata)),
        }
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}
