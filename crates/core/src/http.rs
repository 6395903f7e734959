//! Timeout-bounded outbound HTTP client.
//!
//! The client never classifies status codes. Any completed exchange is
//! returned as an [`HttpResponse`]; only faults (connect errors, body read
//! errors, timeouts) become [`GatewayError::Upstream`].

use crate::error::{GatewayError, GatewayResult};
use crate::metadata::CallMetadata;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::time::Duration;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

const USER_AGENT: &str = concat!("taskbridge-mcp/", env!("CARGO_PKG_VERSION"));

/// One outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status and raw body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(metadata: &CallMetadata) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                GatewayError::config(
                    format!("Failed to create HTTP client: {}", e.without_url()),
                    metadata,
                )
            })?;

        Ok(Self { client })
    }

    /// Issue `request`, aborting it if it outlives its timeout.
    pub async fn send(&self, request: HttpRequest, metadata: &CallMetadata) -> GatewayResult<HttpResponse> {
        let target = redacted_target(&request.url);
        let timeout = request.timeout;

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(HttpResponse { status, body })
        };

        // Expiry drops `exchange`, which tears down the in-flight connection.
        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(GatewayError::upstream(
                format!("Request to {} failed: {}", target, e.without_url()),
                None,
                metadata,
            )),
            Err(_) => Err(GatewayError::upstream(
                format!("Request to {} timed out after {} ms", target, timeout.as_millis()),
                None,
                metadata,
            )),
        }
    }
}

/// Origin and path of `url`; userinfo, query and fragment are dropped.
pub fn redacted_target(url: &Url) -> String {
    format!("{}{}", url.origin().ascii_serialization(), url.path())
}
