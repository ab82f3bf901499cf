//! Structured logging
//!
//! Everything is written to stderr: stdout carries the MCP protocol.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ObservabilityError, Result};

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_format {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_ansi(false);
        registry.with(layer).try_init()
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_ansi(config.ansi_colors);
        registry.with(layer).try_init()
    };
    installed.map_err(|e| ObservabilityError::logging(e.to_string()))?;

    tracing::debug!(
        target: "glean_observability",
        "Logging initialized with level: {}",
        config.level
    );
    Ok(())
}

/// Build the environment filter
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ObservabilityError::config(format!("Invalid log level: {}", e)))?;

    for (module, level) in &config.module_levels {
        filter = filter.add_directive(
            format!("{}={}", module, level)
                .parse()
                .map_err(|e| ObservabilityError::config(format!("Invalid directive: {}", e)))?,
        );
    }

    Ok(filter)
}

/// Span wrapping one tool invocation
pub fn request_span(request_id: &str, tool: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id,
        tool = %tool,
    )
}
