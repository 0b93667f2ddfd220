// Project-wide constants
//
// Centralised here so default paths and user-facing strings have one
// source of truth. Import via `use crate::config::constants::*;`.

/// Default bind address for the chat server (localhost only).
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

/// Default local generation server.
pub const DEFAULT_MODEL_ENDPOINT: &str = "http://127.0.0.1:8080";

/// Directory the model bundle is cloned into when absent.
pub const DEFAULT_MODEL_BASE_PATH: &str = "./RAG_models";

/// Model directory inside the bundle.
pub const DEFAULT_MODEL_SUBDIR: &str = "Sft_model";

/// Per-session interaction logs live here.
pub const DEFAULT_LOG_DIR: &str = "./log";

/// Cooldown before the single busy retry of model construction.
pub const DEFAULT_OOM_COOLDOWN_SECS: u64 = 30;

/// Periodic publishing interval (one hour).
pub const DEFAULT_PUBLISH_INTERVAL_SECS: u64 = 3600;

/// Session time limit before the handle is reclaimed (five minutes).
pub const DEFAULT_RECLAIM_INTERVAL_SECS: u64 = 300;

pub const DEFAULT_MAX_SESSIONS: usize = 100;

/// Idle time after which a session is dropped and its log flushed.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 30;

pub const DEFAULT_AUTHOR_NAME: &str = "chatdesk-bot";
pub const DEFAULT_AUTHOR_EMAIL: &str = "chatdesk-bot@localhost";

// User-facing messages

pub const BUSY_NOTICE: &str = "The service is busy, please wait...";
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a query to send.";
pub const GENERATION_ERROR_MESSAGE: &str = "An error occurred while generating the response.";
pub const SUGGESTION_PROMPT_MESSAGE: &str = "Please enter your suggestion.";
pub const EMPTY_SUGGESTION_MESSAGE: &str = "Please enter your suggestion before submitting.";
pub const THANK_YOU_MESSAGE: &str = "Thank you for your feedback!";
