// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

pub use loader::{default_config_path, load_config, parse_config_str, ENV_LOG_REPO_URL, ENV_MODEL_REPO_URL};
pub use settings::{
    Config, FeedbackConfig, FeedbackOptions, LoggingConfig, ModelConfig, PublishConfig,
    PublishMode, ServerConfig,
};
