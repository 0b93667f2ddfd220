// Log publishing - ships per-session interaction logs to a remote store

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod git;
pub mod task;

pub use git::GitLogPublisher;
pub use task::{PublishTask, TickReport};

/// Exports a log file somewhere durable. Only ever reads `log_file`.
#[async_trait]
pub trait LogPublisher: Send + Sync {
    async fn publish(&self, log_file: &Path) -> Result<()>;
}
