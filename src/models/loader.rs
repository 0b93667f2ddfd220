// Resource loader - acquires the shared inference handle exactly once
//
// The handle lives in a process-wide slot; sessions hold a reference to it.
// Construction that fails with resource exhaustion gets one busy notice, one
// cooldown, and one retry. Nothing else is retried.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::handle::{GenerationLease, InferenceHandle, ModelFactory};
use super::provision::ArtifactFetcher;
use crate::config::constants::BUSY_NOTICE;
use crate::errors::LoadError;

/// Result of `ResourceLoader::acquire`
#[derive(Debug)]
pub struct AcquireOutcome {
    pub handle: Arc<InferenceHandle>,
    /// User-visible notices produced while acquiring (busy retry)
    pub notices: Vec<String>,
}

/// Result of `ResourceLoader::lease`
#[derive(Debug)]
pub struct LeaseOutcome {
    pub lease: GenerationLease,
    pub notices: Vec<String>,
}

/// A release can land between acquire and lock; go back to acquire once
const LEASE_ATTEMPTS: usize = 2;

pub struct ResourceLoader {
    model_dir: PathBuf,
    fetcher: Arc<dyn ArtifactFetcher>,
    factory: Arc<dyn ModelFactory>,
    cooldown: Duration,
    slot: Mutex<Option<Arc<InferenceHandle>>>,
}

impl ResourceLoader {
    pub fn new(
        model_dir: PathBuf,
        fetcher: Arc<dyn ArtifactFetcher>,
        factory: Arc<dyn ModelFactory>,
        cooldown: Duration,
    ) -> Self {
        Self {
            model_dir,
            fetcher,
            factory,
            cooldown,
            slot: Mutex::new(None),
        }
    }

    /// Fetch the artifact bundle if absent, without loading anything
    pub async fn provision(&self) -> Result<()> {
        self.fetcher
            .ensure()
            .await
            .context("Failed to provision model artifacts")
    }

    /// Return the session's handle, loading it if needed.
    ///
    /// `held` is the session's reference; it is filled in on success and
    /// returned unchanged when it already points at a live handle.
    pub async fn acquire(&self, held: &mut Option<Arc<InferenceHandle>>) -> Result<AcquireOutcome> {
        if let Some(handle) = held.as_ref().filter(|h| !h.is_released()) {
            return Ok(AcquireOutcome {
                handle: Arc::clone(handle),
                notices: Vec::new(),
            });
        }

        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_ref().filter(|h| !h.is_released()) {
            *held = Some(Arc::clone(handle));
            return Ok(AcquireOutcome {
                handle: Arc::clone(handle),
                notices: Vec::new(),
            });
        }

        self.provision().await?;

        let mut notices = Vec::new();
        let model = match self.factory.load(&self.model_dir).await {
            Ok(model) => model,
            Err(e) if e.is_resource_exhausted() => {
                tracing::warn!(
                    "Model load hit resource exhaustion ({}), retrying once in {:?}",
                    e,
                    self.cooldown
                );
                notices.push(BUSY_NOTICE.to_string());
                self.factory.reclaim().await;
                tokio::time::sleep(self.cooldown).await;

                self.factory
                    .load(&self.model_dir)
                    .await
                    .map_err(anyhow::Error::new)
                    .context("Model load failed after busy retry")?
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Model load failed")),
        };

        let handle = Arc::new(InferenceHandle::new(model));
        tracing::info!(handle = %handle.id(), model = handle.model_name(), "✓ Inference handle ready");

        *slot = Some(Arc::clone(&handle));
        *held = Some(Arc::clone(&handle));

        Ok(AcquireOutcome { handle, notices })
    }

    /// Acquire the handle and lock it for one generation.
    ///
    /// If the handle is reclaimed while waiting for the lock, the session's
    /// reference is stale and acquire loads a fresh one.
    pub async fn lease(&self, held: &mut Option<Arc<InferenceHandle>>) -> Result<LeaseOutcome> {
        let mut notices = Vec::new();
        for _ in 0..LEASE_ATTEMPTS {
            let acquired = self.acquire(held).await?;
            notices.extend(acquired.notices);
            if let Some(lease) = acquired.handle.lease().await {
                return Ok(LeaseOutcome { lease, notices });
            }
            tracing::debug!(handle = %acquired.handle.id(), "Handle released before generation started, reacquiring");
        }
        anyhow::bail!("Inference handle was released before generation could start")
    }

    /// Drop the session's reference and reclaim the model behind it.
    ///
    /// Returns true if device memory was actually released.
    pub async fn release(&self, held: &mut Option<Arc<InferenceHandle>>) -> bool {
        let Some(handle) = held.take() else {
            return false;
        };

        {
            let mut slot = self.slot.lock().await;
            if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &handle)) {
                *slot = None;
            }
        }

        handle.release().await
    }

    /// Whether the process-wide slot currently holds a live handle
    pub async fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_released())
    }
}

/// Whether an acquire failure was provisioning (as opposed to load)
pub fn is_provisioning_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<LoadError>(), Some(LoadError::Provisioning(_))))
}
