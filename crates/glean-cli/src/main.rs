use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glean_client::GleanChatProxy;
use glean_config::{
    GleanConfig, ENV_ACT_AS, ENV_API_KEY, ENV_BASE_URL, ENV_SAVE_CHAT, ENV_STREAM, ENV_TIMEOUT_SECS,
};
use glean_mcp::McpServer;
use glean_observability::{init_logging, LoggingConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-glean")]
#[command(about = "MCP server for Glean's Chat API")]
#[command(version)]
struct Cli {
    /// Working directory to switch to before starting
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Glean API key (overrides GLEAN_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// REST API v1 root, e.g. https://acme-be.glean.com/rest/api/v1 (overrides GLEAN_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds (overrides GLEAN_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// User a global token acts on behalf of (overrides GLEAN_ACT_AS)
    #[arg(long)]
    act_as: Option<String>,

    /// Default for the tool's saveChat flag (overrides GLEAN_SAVE_CHAT)
    #[arg(long)]
    save_chat: Option<bool>,

    /// Default for the tool's stream flag (overrides GLEAN_STREAM)
    #[arg(long)]
    stream: Option<bool>,

    /// Log filter
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Per-module log level, e.g. `glean_client=debug` (repeatable)
    #[arg(long = "log-module", value_name = "MODULE=LEVEL")]
    log_modules: Vec<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Colorize text logs
    #[arg(long)]
    ansi: bool,
}

impl Cli {
    /// Value given on the command line for a configuration variable
    fn flag(&self, key: &str) -> Option<String> {
        match key {
            ENV_API_KEY => self.api_key.clone(),
            ENV_BASE_URL => self.base_url.clone(),
            ENV_TIMEOUT_SECS => self.timeout_secs.map(|s| s.to_string()),
            ENV_ACT_AS => self.act_as.clone(),
            ENV_SAVE_CHAT => self.save_chat.map(|b| b.to_string()),
            ENV_STREAM => self.stream.map(|b| b.to_string()),
            _ => None,
        }
    }

    fn logging_config(&self) -> Result<LoggingConfig> {
        let mut logging = LoggingConfig::default()
            .with_level(self.log_level.clone())
            .with_json_format(self.json_logs)
            .with_ansi_colors(self.ansi);

        for entry in &self.log_modules {
            let (module, level) = entry
                .split_once('=')
                .with_context(|| format!("expected MODULE=LEVEL, got '{}'", entry))?;
            logging = logging.with_module_level(module.trim(), level.trim());
        }
        Ok(logging)
    }

    /// Flags first, then the process environment
    fn load_config(&self) -> Result<GleanConfig> {
        GleanConfig::from_lookup(|key| self.flag(key).or_else(|| std::env::var(key).ok()))
            .context("invalid Glean configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let logging = cli.logging_config()?;
    init_logging(&logging).context("failed to initialize logging")?;

    let config = cli.load_config()?;
    tracing::info!("Starting Glean MCP server");
    tracing::info!("  Base URL: {}", config.base_url);
    tracing::info!("  Timeout: {}s", config.timeout.as_secs());
    tracing::info!("  API key configured: {}", config.api_key.is_some());
    tracing::debug!("Configuration: {:?}", config);

    let defaults = config.defaults;
    let proxy = GleanChatProxy::new(config).context("failed to create Glean chat proxy")?;
    let server = McpServer::new(Arc::new(proxy), defaults);

    server.run_stdio().await.context("MCP transport failed")?;
    Ok(())
}
