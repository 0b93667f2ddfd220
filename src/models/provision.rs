// Model artifact provisioning - fetch the bundle if it isn't on disk yet
//
// The bundle is a git repository (weights via git-lfs). Any failure here is
// fatal: there is nothing to serve without it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::ModelConfig;
use crate::errors::LoadError;
use crate::git::{redact_url, run_git};

/// Makes sure the model artifact bundle exists locally
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn ensure(&self) -> Result<(), LoadError>;
}

/// Clones the model bundle with git (and git-lfs) when absent
pub struct GitArtifactFetcher {
    repo_url: Option<String>,
    base_path: PathBuf,
    subdir: String,
    lfs: bool,
}

impl GitArtifactFetcher {
    pub fn new(repo_url: Option<String>, base_path: PathBuf, subdir: String, lfs: bool) -> Self {
        Self {
            repo_url,
            base_path,
            subdir,
            lfs,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            config.repo_url.clone(),
            config.base_path.clone(),
            config.subdir.clone(),
            config.lfs,
        )
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl ArtifactFetcher for GitArtifactFetcher {
    async fn ensure(&self) -> Result<(), LoadError> {
        if self.base_path.exists() {
            tracing::debug!("Model bundle present at {}", self.base_path.display());
            return Ok(());
        }

        let Some(url) = self.repo_url.as_deref() else {
            return Err(LoadError::Provisioning(format!(
                "model bundle missing at {} and no repository URL configured",
                self.base_path.display()
            )));
        };

        tracing::info!(
            "Cloning model bundle from {} into {}",
            redact_url(url),
            self.base_path.display()
        );

        let target = self.base_path.to_string_lossy().into_owned();
        run_git(&["clone", url, &target], None)
            .await
            .map_err(|e| LoadError::Provisioning(format!("{:#}", e)))?;

        if self.lfs {
            run_git(&["lfs", "install"], None)
                .await
                .map_err(|e| LoadError::Provisioning(format!("{:#}", e)))?;

            let model_dir = self.base_path.join(&self.subdir);
            let output = run_git(&["lfs", "pull"], Some(&model_dir))
                .await
                .map_err(|e| LoadError::Provisioning(format!("{:#}", e)))?;
            tracing::info!("LFS pull output: {}", output.trim());
        }

        tracing::info!("✓ Model bundle ready at {}", self.base_path.display());
        Ok(())
    }
}
