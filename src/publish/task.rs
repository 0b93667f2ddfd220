// Background publishing task - one per session
//
// Sleeps for the configured interval, publishes the session's log, and in
// reclaim mode releases the session's inference handle. Failures are logged
// to diagnostics and the loop carries on; only cancellation ends it. A session
// that expired gets one last publish on the way out.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::LogPublisher;
use crate::config::PublishMode;
use crate::models::ResourceLoader;
use crate::session::Session;

/// What one wake did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub published: bool,
    pub reclaimed: bool,
}

pub struct PublishTask {
    session: Arc<Session>,
    publisher: Option<Arc<dyn LogPublisher>>,
    loader: Arc<ResourceLoader>,
    mode: PublishMode,
    interval: Duration,
}

impl PublishTask {
    pub fn new(
        session: Arc<Session>,
        publisher: Option<Arc<dyn LogPublisher>>,
        loader: Arc<ResourceLoader>,
        mode: PublishMode,
        interval: Duration,
    ) -> Self {
        Self {
            session,
            publisher,
            loader,
            mode,
            interval,
        }
    }

    /// One wake: publish, then reclaim if configured
    pub async fn tick(&self) -> TickReport {
        let published = self.publish_log().await;

        let reclaimed = match self.mode {
            PublishMode::Periodic => false,
            PublishMode::Reclaim => {
                let mut state = self.session.state().await;
                let reclaimed = self.loader.release(&mut state.model).await;
                if reclaimed {
                    tracing::info!(session = %self.session.id(), "Inference handle reclaimed after session time limit");
                }
                reclaimed
            }
        };

        TickReport {
            published,
            reclaimed,
        }
    }

    /// Ship the session log once; returns whether it went out
    pub async fn publish_log(&self) -> bool {
        let session_id = self.session.id();
        let log_path = self.session.log().path();

        match &self.publisher {
            Some(publisher) => match publisher.publish(log_path).await {
                Ok(()) => {
                    tracing::info!(session = %session_id, "✓ Published {}", log_path.display());
                    true
                }
                Err(e) => {
                    tracing::error!(session = %session_id, "Log publish failed: {:#}", e);
                    false
                }
            },
            None => {
                tracing::debug!(session = %session_id, "No log repository configured, skipping publish");
                false
            }
        }
    }

    /// Run `tick` every interval until the session is cancelled
    pub fn spawn(self) -> JoinHandle<()> {
        let cancel = self.session.cancellation();
        tokio::spawn(async move {
            tracing::debug!(
                session = %self.session.id(),
                "Publisher started ({:?}, every {:?})",
                self.mode,
                self.interval
            );
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        if self.session.is_expired() {
                            self.publish_log().await;
                        }
                        break;
                    }
                    _ = tokio::time::sleep(self.interval) => {
                        self.tick().await;
                    }
                }
            }
            tracing::debug!(session = %self.session.id(), "Publisher stopped");
        })
    }
}
