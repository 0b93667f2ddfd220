// Configuration loader
// Loads settings from ~/.chatdesk/config.toml (or an explicit path) plus env overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Env var overriding `model.repo_url`
pub const ENV_MODEL_REPO_URL: &str = "CHATDESK_MODEL_REPO_URL";
/// Env var overriding `publish.repo_url`
pub const ENV_LOG_REPO_URL: &str = "CHATDESK_LOG_REPO_URL";

/// Default config location: ~/.chatdesk/config.toml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".chatdesk").join("config.toml"))
}

/// Load configuration from `path` (or the default location), then apply env overrides.
///
/// A missing file is not an error: every field has a default.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);

    let mut config = match path {
        Some(ref p) if p.exists() => parse_config_file(p)?,
        Some(ref p) => {
            tracing::debug!("No config file at {}, using defaults", p.display());
            Config::default()
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML config text
pub fn parse_config_str(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)?;
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_MODEL_REPO_URL).filter(|v| !v.is_empty()) {
        config.model.repo_url = Some(url);
    }
    if let Some(url) = lookup(ENV_LOG_REPO_URL).filter(|v| !v.is_empty()) {
        config.publish.repo_url = Some(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedbackOptions, PublishMode};
    use std::time::Duration;

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = parse_config_str(
            r#"
            [logging]
            log_responses = true

            [feedback]
            options = "three_button"

            [publish]
            mode = "reclaim"
            interval_secs = 60
            "#,
        )
        .unwrap();

        assert!(config.logging.log_responses);
        assert_eq!(config.feedback.options, FeedbackOptions::ThreeButton);
        assert_eq!(config.publish.mode, PublishMode::Reclaim);
        assert_eq!(config.publish.interval(), Duration::from_secs(60));
        // Untouched sections fall back to defaults
        assert_eq!(config.model.subdir, "Sft_model");
        assert_eq!(config.server.max_sessions, 100);
    }

    #[test]
    fn test_unknown_feedback_option_rejected() {
        let result = parse_config_str("[feedback]\noptions = \"five_button\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_repo_urls() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            ENV_MODEL_REPO_URL => Some("https://example.com/models.git".to_string()),
            ENV_LOG_REPO_URL => Some(String::new()),
            _ => None,
        });

        assert_eq!(
            config.model.repo_url.as_deref(),
            Some("https://example.com/models.git")
        );
        // Empty values don't clobber
        assert!(config.publish.repo_url.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8501");
    }
}
