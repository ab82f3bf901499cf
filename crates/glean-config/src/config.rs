use std::time::Duration;

/// Environment variable holding the Glean API token
pub const ENV_API_KEY: &str = "GLEAN_API_KEY";
/// Environment variable holding the REST API v1 root
pub const ENV_BASE_URL: &str = "GLEAN_BASE_URL";
/// Environment variable overriding the request timeout, in seconds
pub const ENV_TIMEOUT_SECS: &str = "GLEAN_TIMEOUT_SECS";
/// Environment variable naming the user a global token acts as
pub const ENV_ACT_AS: &str = "GLEAN_ACT_AS";
/// Environment variable for the default `saveChat` flag
pub const ENV_SAVE_CHAT: &str = "GLEAN_SAVE_CHAT";
/// Environment variable for the default `stream` flag
pub const ENV_STREAM: &str = "GLEAN_STREAM";

/// Path every base URL must end with
pub const API_ROOT_PATH: &str = "/rest/api/v1";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Glean connection settings
///
/// Built once at startup and shared read-only by every request.
#[derive(Clone, PartialEq, Eq)]
pub struct GleanConfig {
    /// API token; a missing token fails each call rather than startup
    pub api_key: Option<String>,
    /// REST API v1 root, e.g. `https://acme-be.glean.com/rest/api/v1`
    pub base_url: String,
    pub timeout: Duration,
    /// User a global token acts on behalf of (`X-Glean-ActAs`)
    pub act_as: Option<String>,
    pub defaults: ChatDefaults,
}

/// Flags applied when a tool call omits them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatDefaults {
    pub save_chat: bool,
    pub stream: bool,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            save_chat: true,
            stream: false,
        }
    }
}

impl GleanConfig {
    /// Create a config for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            act_as: None,
            defaults: ChatDefaults::default(),
        }
    }

    /// Set API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Act on behalf of another user
    pub fn with_act_as(mut self, email: impl Into<String>) -> Self {
        self.act_as = Some(email.into());
        self
    }

    /// Set tool defaults
    pub fn with_defaults(mut self, defaults: ChatDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Load from the process environment
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup, then validate.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let mut config = Self::new(base_url);
        config.api_key = get(ENV_API_KEY);
        config.act_as = get(ENV_ACT_AS);

        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config = config.with_timeout(parse_timeout(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_SAVE_CHAT) {
            config.defaults.save_chat = parse_bool(ENV_SAVE_CHAT, &raw)?;
        }
        if let Some(raw) = get(ENV_STREAM) {
            config.defaults.stream = parse_bool(ENV_STREAM, &raw)?;
        }

        if config.api_key.is_none() {
            tracing::warn!("{} is not set; chat requests will fail until it is configured", ENV_API_KEY);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the base URL scheme and API root, and the timeout
    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.base_url.trim_end_matches('/');
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| {
                ConfigError::Validation(format!(
                    "{} must be an http(s) URL, got '{}'",
                    ENV_BASE_URL, self.base_url
                ))
            })?;

        if rest.is_empty() || rest.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "{} has no host: '{}'",
                ENV_BASE_URL, self.base_url
            )));
        }
        if !url.ends_with(API_ROOT_PATH) {
            return Err(ConfigError::Validation(format!(
                "{} must end with {}, got '{}'",
                ENV_BASE_URL, API_ROOT_PATH, self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation("timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Full URL of a REST resource below the API root
    pub fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for GleanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GleanConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("act_as", &self.act_as)
            .field("defaults", &self.defaults)
            .finish()
    }
}

fn parse_bool(key: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got '{}'", raw),
        }),
    }
}

fn parse_timeout(key: &'static str, raw: &str) -> ConfigResult<Duration> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("expected a positive number of seconds, got '{}'", raw),
        }),
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
