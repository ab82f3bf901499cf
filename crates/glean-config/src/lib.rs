pub mod config;

pub use config::{
    ChatDefaults, ConfigError, ConfigResult, GleanConfig, API_ROOT_PATH, DEFAULT_TIMEOUT,
    ENV_ACT_AS, ENV_API_KEY, ENV_BASE_URL, ENV_SAVE_CHAT, ENV_STREAM, ENV_TIMEOUT_SECS,
};
