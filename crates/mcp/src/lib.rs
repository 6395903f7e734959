// MCP (Model Context Protocol) server exposing issue tracker and
// project configuration tools to agent clients over stdio.

pub mod context;
pub mod format;
pub mod jira;
pub mod project_config;
pub mod protocol;
pub mod server;
pub mod tools;

pub use context::ServerContext;
pub use server::McpServer;
