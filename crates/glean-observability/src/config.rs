//! Logging configuration

use std::collections::HashMap;

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or full `EnvFilter` syntax)
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,

    /// Colorize output
    pub ansi_colors: bool,

    /// Include the event target
    pub include_target: bool,

    /// Per-module overrides, e.g. `glean_client` → `debug`
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            ansi_colors: false,
            include_target: true,
            module_levels: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Set log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set whether to use JSON format
    pub fn with_json_format(mut self, json: bool) -> Self {
        self.json_format = json;
        self
    }

    /// Set whether text output is colorized
    pub fn with_ansi_colors(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    /// Add a module-specific level
    pub fn with_module_level(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.module_levels.insert(module.into(), level.into());
        self
    }
}
