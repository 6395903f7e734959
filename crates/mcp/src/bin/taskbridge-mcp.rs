// Standalone MCP server binary

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde_json::json;
use taskbridge_core::logging::{self, LogFormat};
use taskbridge_core::{CallMetadata, Settings};
use taskbridge_mcp::{McpServer, ServerContext};

#[derive(Parser, Debug)]
#[command(name = "taskbridge-mcp")]
#[command(about = "MCP server for issue tracker and project configuration tools", long_about = None)]
struct Args {
    /// Log output format (logs go to stderr)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = Format::Json)]
    log_format: Format,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Pretty,
}

impl From<Format> for LogFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => LogFormat::Json,
            Format::Pretty => LogFormat::Pretty,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_format.into());

    let metadata = CallMetadata::server("startup");
    logging::info(
        "Taskbridge MCP server starting",
        &metadata,
        json!({ "version": env!("CARGO_PKG_VERSION") }),
    );

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            logging::error("Refusing to start: invalid configuration", &metadata, error.log_fields());
            std::process::exit(1);
        }
    };

    let context = ServerContext::from_settings(settings)?;
    McpServer::new(context).start().await
}
