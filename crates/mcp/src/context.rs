// Shared, immutable state handed to the server

use crate::jira::JiraClient;
use crate::project_config::ProjectConfigStore;
use crate::tools::{default_registry, ToolRegistry};
use anyhow::{Context, Result};
use std::sync::Arc;
use taskbridge_core::storage::ObjectStoreBlobStore;
use taskbridge_core::{CallMetadata, HttpClient, Settings};

/// Settings plus the tool registry built from them.
///
/// Built once at startup and never mutated; every invocation reads it.
#[derive(Clone)]
pub struct ServerContext {
    pub settings: Arc<Settings>,
    pub registry: Arc<ToolRegistry>,
}

impl ServerContext {
    pub fn new(settings: Arc<Settings>, registry: ToolRegistry) -> Self {
        Self {
            settings,
            registry: Arc::new(registry),
        }
    }

    /// Wire the domain clients and register every tool.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let metadata = CallMetadata::server("build_context");
        let timeout = settings.upstream_timeout;

        let http = HttpClient::new(&metadata)?;
        let jira = JiraClient::new(&settings.jira, http, timeout, &metadata)?;

        let store = settings.store.build_store(&metadata)?;
        let blobs = ObjectStoreBlobStore::new(store, settings.store.prefix.clone()).with_timeout(timeout);
        let configs = ProjectConfigStore::new(Arc::new(blobs));

        let registry = default_registry(Arc::new(jira), Arc::new(configs))
            .context("Failed to register built-in tools")?;

        Ok(Self::new(Arc::new(settings), registry))
    }
}
