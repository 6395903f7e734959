// Core infrastructure for the Taskbridge MCP server:
// error taxonomy, call metadata, log sink, bounded HTTP client,
// schema validation, configuration and blob storage.

pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod logging;
pub mod metadata;
pub mod storage;
pub mod validation;

pub use config::{JiraSettings, Secret, Settings, StoreSettings};
pub use envelope::Envelope;
pub use error::{GatewayError, GatewayResult};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use metadata::CallMetadata;
pub use validation::Contract;
