// Per-session context
//
// Everything a handler needs about one client lives here, passed explicitly.
// Mutable state sits behind one async mutex so a session's interactions run
// one at a time, like the single-threaded UI loop they model.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::FeedbackOptions;
use crate::feedback::FeedbackCollector;
use crate::logging::InteractionLogger;
use crate::models::{InferenceHandle, Turn};

/// Mutable per-session state
#[derive(Debug)]
pub struct SessionState {
    /// Reference to the shared handle; None until loaded or after reclaim
    pub model: Option<Arc<InferenceHandle>>,
    pub last_result: Option<String>,
    pub feedback: FeedbackCollector,
    pub history: Vec<Turn>,
}

impl SessionState {
    fn new(options: FeedbackOptions) -> Self {
        Self {
            model: None,
            last_result: None,
            feedback: FeedbackCollector::new(options),
            history: Vec::new(),
        }
    }
}

pub struct Session {
    id: String,
    started_at: DateTime<Local>,
    log: Arc<InteractionLogger>,
    state: Mutex<SessionState>,
    publisher: OnceLock<JoinHandle<()>>,
    cancel: CancellationToken,
    /// Monotonic origin for `last_active_ms`
    opened: Instant,
    last_active_ms: AtomicU64,
    expired: AtomicBool,
}

impl Session {
    pub fn new(id: String, log: InteractionLogger, options: FeedbackOptions) -> Self {
        Self {
            id,
            started_at: Local::now(),
            log: Arc::new(log),
            state: Mutex::new(SessionState::new(options)),
            publisher: OnceLock::new(),
            cancel: CancellationToken::new(),
            opened: Instant::now(),
            last_active_ms: AtomicU64::new(0),
            expired: AtomicBool::new(false),
        }
    }

    /// User token
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn log(&self) -> &Arc<InteractionLogger> {
        &self.log
    }

    pub async fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().await
    }

    /// Fires when the session goes away
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Record activity now
    pub fn touch(&self) {
        let elapsed = self.opened.elapsed().as_millis() as u64;
        self.last_active_ms.fetch_max(elapsed, Ordering::SeqCst);
    }

    /// Time since the last interaction
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_active_ms.load(Ordering::SeqCst));
        self.opened.elapsed().saturating_sub(last)
    }

    /// Drop the session for inactivity. The publisher flushes the log once
    /// more before stopping.
    pub fn expire(&self) {
        self.expired.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Start the background publisher unless one was already started.
    ///
    /// `spawn` runs at most once per session; returns whether it ran.
    pub fn start_publisher<F>(&self, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let mut started = false;
        self.publisher.get_or_init(|| {
            started = true;
            spawn()
        });
        started
    }

    pub fn publisher_started(&self) -> bool {
        self.publisher.get().is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("started_at", &self.started_at)
            .field("log", &self.log.path())
            .field("publisher_started", &self.publisher_started())
            .finish()
    }
}
