// Inference handle - the loaded, ready-to-query model
//
// The model itself is an external collaborator behind `InferenceModel`;
// construction goes through `ModelFactory` so the loader can be exercised
// with fakes.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::errors::LoadError;

/// One completed exchange, fed back to the model as history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub query: String,
    pub response: String,
}

/// Channel a model streams cumulative partial responses into
pub type PartialSender = mpsc::Sender<Result<String>>;

/// A loaded model that can stream a chat response
#[async_trait]
pub trait InferenceModel: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Stream the response to `query`.
    ///
    /// Each value sent is the full response so far; the last one sent is the
    /// final answer. Returning `Err` aborts the stream.
    async fn stream_chat(&self, query: &str, history: &[Turn], tx: &PartialSender) -> Result<()>;

    /// Free device memory held by this model
    async fn release(&self) {}
}

/// Builds models from a local artifact directory
#[async_trait]
pub trait ModelFactory: Send + Sync {
    async fn load(&self, model_dir: &Path) -> Result<Arc<dyn InferenceModel>, LoadError>;

    /// Drop whatever a failed `load` left allocated
    async fn reclaim(&self) {}
}

/// Process-wide shared handle around a loaded model.
///
/// Generation is serialised per handle; once released the handle is never
/// handed out again.
pub struct InferenceHandle {
    id: Uuid,
    model: Arc<dyn InferenceModel>,
    generation: Arc<Mutex<()>>,
    released: AtomicBool,
}

/// Exclusive use of a live handle for one generation.
///
/// While a lease is held the handle cannot be released.
pub struct GenerationLease {
    handle: Arc<InferenceHandle>,
    _guard: OwnedMutexGuard<()>,
}

impl GenerationLease {
    pub fn handle(&self) -> &Arc<InferenceHandle> {
        &self.handle
    }
}

impl std::fmt::Debug for GenerationLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("GenerationLease").field(&self.handle.id).finish()
    }
}

impl InferenceHandle {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            generation: Arc::new(Mutex::new(())),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &Arc<dyn InferenceModel> {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Wait for exclusive use of the model.
    ///
    /// None if the handle was released before the lock came free.
    pub async fn lease(self: &Arc<Self>) -> Option<GenerationLease> {
        let guard = Arc::clone(&self.generation).lock_owned().await;
        if self.is_released() {
            return None;
        }
        Some(GenerationLease {
            handle: Arc::clone(self),
            _guard: guard,
        })
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Mark released and free the model. Waits for any in-flight generation.
    ///
    /// Returns false if the handle was already released.
    pub async fn release(&self) -> bool {
        let _guard = self.generation.lock().await;
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.model.release().await;
        tracing::info!(handle = %self.id, model = self.model.name(), "Inference handle released");
        true
    }
}

impl std::fmt::Debug for InferenceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceHandle")
            .field("id", &self.id)
            .field("model", &self.model.name())
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingModel {
        releases: AtomicUsize,
    }

    #[async_trait]
    impl InferenceModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn stream_chat(&self, _q: &str, _h: &[Turn], _tx: &PartialSender) -> Result<()> {
            Ok(())
        }

        async fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_release_is_once_only() {
        let model = Arc::new(CountingModel {
            releases: AtomicUsize::new(0),
        });
        let handle = InferenceHandle::new(model.clone());

        assert!(!handle.is_released());
        assert!(handle.release().await);
        assert!(!handle.release().await);
        assert!(handle.is_released());
        assert_eq!(model.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_waits_for_lease() {
        let model = Arc::new(CountingModel {
            releases: AtomicUsize::new(0),
        });
        let handle = Arc::new(InferenceHandle::new(model.clone()));

        let lease = handle.lease().await.unwrap();
        let releasing = tokio::spawn({
            let handle = Arc::clone(&handle);
            async move { handle.release().await }
        });
        tokio::task::yield_now().await;
        assert!(!handle.is_released(), "Release must wait for the generation");

        drop(lease);
        assert!(releasing.await.unwrap());
        assert!(handle.is_released());
        assert!(handle.lease().await.is_none());
    }
}
