// Configuration structs

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::constants::*;

/// Local model bundle and generation server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory the artifact bundle lives in (cloned if absent)
    pub base_path: PathBuf,
    /// Model directory inside the bundle
    pub subdir: String,
    /// Fetch-if-absent source; may carry credentials, so usually set via env
    pub repo_url: Option<String>,
    /// Run `git lfs install` / `git lfs pull` after cloning
    pub lfs: bool,
    /// Local generation server base URL
    pub endpoint: String,
    /// Model name sent to the generation server
    pub name: String,
    pub top_p: f32,
    pub temperature: f32,
    /// Wait before the one retry after resource exhaustion
    pub oom_cooldown_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_MODEL_BASE_PATH),
            subdir: DEFAULT_MODEL_SUBDIR.to_string(),
            repo_url: None,
            lfs: true,
            endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            name: DEFAULT_MODEL_SUBDIR.to_string(),
            top_p: 0.7,
            temperature: 1.0,
            oom_cooldown_secs: DEFAULT_OOM_COOLDOWN_SECS,
        }
    }
}

impl ModelConfig {
    /// Full path of the model directory
    pub fn model_dir(&self) -> PathBuf {
        self.base_path.join(&self.subdir)
    }

    pub fn oom_cooldown(&self) -> Duration {
        Duration::from_secs(self.oom_cooldown_secs)
    }
}

/// Interaction log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    /// Record the final response text for each query
    pub log_responses: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_responses: false,
        }
    }
}

/// Which feedback actions the surface offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOptions {
    /// Satisfied / Unsatisfied
    #[default]
    TwoButton,
    /// Satisfied / Unsatisfied / Suggestion
    ThreeButton,
}

impl FeedbackOptions {
    pub fn allows_suggestion(self) -> bool {
        matches!(self, FeedbackOptions::ThreeButton)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub options: FeedbackOptions,
}

/// How the publisher behaves on each wake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Publish every interval, keep the model loaded
    #[default]
    Periodic,
    /// Publish, then release the session's inference handle
    Reclaim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub enabled: bool,
    pub mode: PublishMode,
    /// Wake delay; defaults depend on `mode` when unset
    pub interval_secs: Option<u64>,
    /// Log repository remote; may carry credentials, so usually set via env
    pub repo_url: Option<String>,
    pub branch: String,
    /// Root for per-publish clones (system temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
    pub author_name: String,
    pub author_email: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: PublishMode::Periodic,
            interval_secs: None,
            repo_url: None,
            branch: "main".to_string(),
            scratch_dir: None,
            author_name: DEFAULT_AUTHOR_NAME.to_string(),
            author_email: DEFAULT_AUTHOR_EMAIL.to_string(),
        }
    }
}

impl PublishConfig {
    pub fn interval(&self) -> Duration {
        let secs = self.interval_secs.unwrap_or(match self.mode {
            PublishMode::Periodic => DEFAULT_PUBLISH_INTERVAL_SECS,
            PublishMode::Reclaim => DEFAULT_RECLAIM_INTERVAL_SECS,
        });
        Duration::from_secs(secs)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8501")
    pub bind_address: String,
    /// Maximum number of concurrent sessions
    pub max_sessions: usize,
    /// Session timeout in minutes
    pub session_timeout_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDR.to_string(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
        }
    }
}

impl ServerConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub logging: LoggingConfig,
    pub feedback: FeedbackConfig,
    pub publish: PublishConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Reject settings that would make the state machine misbehave
    pub fn validate(&self) -> Result<()> {
        if self.publish.interval().is_zero() {
            bail!("publish.interval_secs must be greater than zero");
        }
        if self.publish.author_name.trim().is_empty() || self.publish.author_email.trim().is_empty()
        {
            bail!("publish.author_name and publish.author_email must not be empty");
        }
        if self.publish.branch.trim().is_empty() {
            bail!("publish.branch must not be empty");
        }
        if self.server.max_sessions == 0 {
            bail!("server.max_sessions must be greater than zero");
        }
        if self.server.session_timeout_minutes == 0 {
            bail!("server.session_timeout_minutes must be greater than zero");
        }
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            bail!("server.bind_address is not a valid socket address: {}", self.server.bind_address);
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            bail!("model.top_p must be within 0.0..=1.0");
        }
        Ok(())
    }
}
