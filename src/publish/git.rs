// Git log publisher - clone, copy, commit, push
//
// Every publish works in a fresh, uniquely named clone so concurrent sessions
// never share a working tree. The scratch clone is removed afterwards.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::LogPublisher;
use crate::config::PublishConfig;
use crate::git::{redact_url, run_git};

pub struct GitLogPublisher {
    repo_url: String,
    branch: String,
    scratch_root: PathBuf,
    author_name: String,
    author_email: String,
}

impl GitLogPublisher {
    pub fn new(
        repo_url: impl Into<String>,
        branch: impl Into<String>,
        scratch_root: PathBuf,
        author_name: impl Into<String>,
        author_email: impl Into<String>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: branch.into(),
            scratch_root,
            author_name: author_name.into(),
            author_email: author_email.into(),
        }
    }

    /// Build from config; None when no remote is configured
    pub fn from_config(config: &PublishConfig) -> Option<Self> {
        let url = config.repo_url.clone()?;
        Some(Self::new(
            url,
            config.branch.clone(),
            config.scratch_root(),
            config.author_name.clone(),
            config.author_email.clone(),
        ))
    }

    fn scratch_dir(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
        let unique = Uuid::new_v4().simple().to_string();
        self.scratch_root
            .join(format!("log_repo_{}_{}", stamp, &unique[..8]))
    }

    async fn publish_in(&self, workdir: &Path, log_file: &Path) -> Result<()> {
        let target = workdir.to_string_lossy().into_owned();
        run_git(&["clone", "--depth", "1", &self.repo_url, &target], None)
            .await
            .context("Clone of log repository failed")?;

        let file_name = log_file
            .file_name()
            .with_context(|| format!("Log path has no file name: {}", log_file.display()))?;
        tokio::fs::copy(log_file, workdir.join(file_name))
            .await
            .with_context(|| format!("Failed to copy {} into clone", log_file.display()))?;

        run_git(&["add", "-A"], Some(workdir))
            .await
            .context("Staging log file failed")?;

        let name = format!("user.name={}", self.author_name);
        let email = format!("user.email={}", self.author_email);
        let message = format!("Update interaction log {}", file_name.to_string_lossy());
        run_git(
            &["-c", &name, "-c", &email, "commit", "-m", &message],
            Some(workdir),
        )
        .await
        .context("Commit of log file failed")?;

        let refspec = format!("HEAD:{}", self.branch);
        run_git(&["push", "origin", &refspec], Some(workdir))
            .await
            .context("Push of log repository failed")?;

        Ok(())
    }
}

#[async_trait]
impl LogPublisher for GitLogPublisher {
    async fn publish(&self, log_file: &Path) -> Result<()> {
        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .with_context(|| format!("Failed to create scratch root {}", self.scratch_root.display()))?;

        let workdir = self.scratch_dir();
        tracing::debug!(
            "Publishing {} to {} via {}",
            log_file.display(),
            redact_url(&self.repo_url),
            workdir.display()
        );

        let result = self.publish_in(&workdir, log_file).await;

        if workdir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
                tracing::warn!("Failed to remove scratch clone {}: {}", workdir.display(), e);
            }
        }

        result
    }
}
