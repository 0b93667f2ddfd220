// Session manager - lazily creates and tracks per-client sessions

use anyhow::{bail, Result};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::context::Session;
use crate::config::FeedbackOptions;
use crate::logging::{session_log_file_name, InteractionLogger};

pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
    max_sessions: usize,
    session_timeout: Duration,
    log_dir: PathBuf,
    feedback_options: FeedbackOptions,
}

impl SessionManager {
    pub fn new(
        max_sessions: usize,
        session_timeout: Duration,
        log_dir: PathBuf,
        feedback_options: FeedbackOptions,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            session_timeout,
            log_dir,
            feedback_options,
        }
    }

    /// Return the session for `id`, or create a new one with a fresh token.
    ///
    /// Returns the session and whether it was just created. Idle sessions
    /// are evicted before the cap is checked.
    pub fn get_or_create(&self, id: Option<&str>) -> Result<(Arc<Session>, bool)> {
        if let Some(session) = id.and_then(|id| self.get(id)) {
            return Ok((session, false));
        }

        self.evict_idle();
        if self.sessions.len() >= self.max_sessions {
            bail!("Session limit reached ({} active)", self.max_sessions);
        }

        let id = Uuid::new_v4().to_string();
        let log_path = self.log_dir.join(session_log_file_name(&id));
        let log = InteractionLogger::open(log_path)?;
        log.info(&format!("New session started with user ID: {}", id))?;

        let session = Arc::new(Session::new(id.clone(), log, self.feedback_options));
        self.sessions.insert(id.clone(), Arc::clone(&session));

        tracing::info!(session = %id, log = %session.log().path().display(), "Session created");
        Ok((session, true))
    }

    /// Look up a session; a successful lookup counts as activity
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        session.touch();
        Some(session)
    }

    /// Remove a session and stop its background publisher
    pub fn delete(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                session.cancel();
                tracing::info!(session = %id, "Session removed");
                true
            }
            None => false,
        }
    }

    /// Expire every session idle for longer than the timeout.
    ///
    /// Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for() >= self.session_timeout)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for id in idle {
            // Re-check under the shard lock; a request may have touched it since
            let removed = self
                .sessions
                .remove_if(&id, |_, session| session.idle_for() >= self.session_timeout);
            if let Some((_, session)) = removed {
                session.expire();
                tracing::info!(session = %id, idle = ?session.idle_for(), "Session expired");
                evicted += 1;
            }
        }
        evicted
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel every session's background work (shutdown)
    pub fn cancel_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().cancel();
        }
    }
}
