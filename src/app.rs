// Chat application - the per-interaction handlers
//
// Each UI event (open, submit, feedback) is one call here with the session
// passed in explicitly. Handlers record to the session's interaction log and
// never let a generation failure take the session down.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::chat::ChatDriver;
use crate::config::constants::{
    EMPTY_QUERY_MESSAGE, GENERATION_ERROR_MESSAGE, SUGGESTION_PROMPT_MESSAGE, THANK_YOU_MESSAGE,
};
use crate::config::{Config, FeedbackOptions};
use crate::errors::FeedbackError;
use crate::feedback::{FeedbackChoice, FeedbackEvent, FeedbackState};
use crate::logging::LogLevel;
use crate::models::{
    is_provisioning_failure, ArtifactFetcher, GitArtifactFetcher, HttpModelFactory, ModelFactory,
    ResourceLoader, Turn,
};
use crate::publish::{GitLogPublisher, LogPublisher, PublishTask};
use crate::session::{Session, SessionManager};

/// Upper bound on how often idle sessions are looked for
const SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Handler failures, each with the message the user sees
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", EMPTY_QUERY_MESSAGE)]
    EmptyQuery,

    #[error("{}", GENERATION_ERROR_MESSAGE)]
    Generation { notices: Vec<String> },

    /// Model could not be provisioned or loaded (retry exhausted)
    #[error("The model is unavailable: {0}")]
    Unavailable(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("{0}")]
    SessionLimit(String),

    #[error("{0}")]
    Feedback(#[from] FeedbackError),
}

/// Reply to a submitted query
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReply {
    pub answer: String,
    /// Busy notices and similar, shown before the answer
    pub notices: Vec<String>,
}

/// Feedback actions from the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackAction {
    Choose(FeedbackChoice),
    SubmitSuggestion(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReply {
    pub state: FeedbackState,
    pub message: String,
}

/// What the surface needs to render a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub feedback_state: FeedbackState,
    pub feedback_choices: Vec<FeedbackChoice>,
    pub last_result: Option<String>,
    pub model_loaded: bool,
    pub publisher_started: bool,
}

pub struct ChatApp {
    config: Config,
    sessions: SessionManager,
    loader: Arc<ResourceLoader>,
    driver: ChatDriver,
    publisher: Option<Arc<dyn LogPublisher>>,
    shutdown: CancellationToken,
}

impl ChatApp {
    pub fn new(
        config: Config,
        loader: Arc<ResourceLoader>,
        publisher: Option<Arc<dyn LogPublisher>>,
    ) -> Self {
        let sessions = SessionManager::new(
            config.server.max_sessions,
            config.server.session_timeout(),
            config.logging.dir.clone(),
            config.feedback.options,
        );
        Self {
            config,
            sessions,
            loader,
            driver: ChatDriver::new(),
            publisher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Wire up the git fetcher, HTTP model backend and git log publisher
    pub fn from_config(config: Config) -> Self {
        let fetcher: Arc<dyn ArtifactFetcher> =
            Arc::new(GitArtifactFetcher::from_config(&config.model));
        let factory: Arc<dyn ModelFactory> = Arc::new(HttpModelFactory::from_config(&config.model));
        let loader = Arc::new(ResourceLoader::new(
            config.model.model_dir(),
            fetcher,
            factory,
            config.model.oom_cooldown(),
        ));

        let publisher = GitLogPublisher::from_config(&config.publish)
            .map(|p| Arc::new(p) as Arc<dyn LogPublisher>);
        if config.publish.enabled && publisher.is_none() {
            tracing::warn!("No log repository configured; interaction logs stay local");
        }

        Self::new(config, loader, publisher)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn loader(&self) -> &Arc<ResourceLoader> {
        &self.loader
    }

    pub fn feedback_options(&self) -> FeedbackOptions {
        self.config.feedback.options
    }

    /// Fetch-if-absent the model bundle; failure is fatal at startup
    pub async fn provision(&self) -> Result<()> {
        self.loader.provision().await
    }

    /// Find or create the session and make sure its publisher runs.
    ///
    /// Safe to call on every interaction; the publisher starts once.
    pub fn open_session(&self, token: Option<&str>) -> Result<Arc<Session>, AppError> {
        let (session, _created) = self
            .sessions
            .get_or_create(token)
            .map_err(|e| AppError::SessionLimit(e.to_string()))?;
        self.ensure_publisher(&session);
        Ok(session)
    }

    pub fn session(&self, id: &str) -> Result<Arc<Session>, AppError> {
        self.sessions
            .get(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))
    }

    /// Start the session's background publisher if it isn't running yet
    pub fn ensure_publisher(&self, session: &Arc<Session>) -> bool {
        if !self.config.publish.enabled {
            return false;
        }
        session.start_publisher(|| {
            PublishTask::new(
                Arc::clone(session),
                self.publisher.clone(),
                Arc::clone(&self.loader),
                self.config.publish.mode,
                self.config.publish.interval(),
            )
            .spawn()
        })
    }

    /// Handle the submit button
    pub async fn submit(&self, session: &Session, query: &str) -> Result<SubmitReply, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::EmptyQuery);
        }

        let user = session.id();
        let mut state = session.state().await;

        let leased = match self.loader.lease(&mut state.model).await {
            Ok(leased) => leased,
            Err(e) => {
                let what = if is_provisioning_failure(&e) {
                    "Model provisioning failed"
                } else {
                    "Model unavailable"
                };
                tracing::error!(session = %user, "{}: {:#}", what, e);
                record(session, LogLevel::Error, &format!("{}: {:#}", what, e));
                return Err(AppError::Unavailable(format!("{:#}", e)));
            }
        };

        record(session, LogLevel::Info, &format!("User ({}) query: {}", user, query));

        let history = state.history.clone();
        let stream = self
            .driver
            .respond(leased.lease, query.to_string(), history);
        let notices = leased.notices;

        let outcome = stream.drain().await;
        // A long generation is still activity
        session.touch();

        match outcome {
            Ok(answer) => {
                state.last_result = Some(answer.clone());
                state.feedback.on_new_result();
                state.history.push(Turn {
                    query: query.to_string(),
                    response: answer.clone(),
                });
                if self.config.logging.log_responses {
                    record(session, LogLevel::Info, &format!("Response to {}: {}", user, answer));
                }
                Ok(SubmitReply { answer, notices })
            }
            Err(e) => {
                tracing::warn!(session = %user, "Generation failed: {:#}", e);
                record(session, LogLevel::Error, &format!("Error: {:#}", e));
                Err(AppError::Generation { notices })
            }
        }
    }

    /// Handle a feedback button or suggestion submission
    pub async fn feedback(&self, session: &Session, action: FeedbackAction) -> Result<FeedbackReply, AppError> {
        let mut state = session.state().await;

        let event = match action {
            FeedbackAction::Choose(choice) => state.feedback.choose(choice)?,
            FeedbackAction::SubmitSuggestion(text) => state.feedback.submit_suggestion(&text)?,
        };

        match event {
            FeedbackEvent::Rated(feedback) => {
                record(session, LogLevel::Info, &feedback.log_message(session.id()));
                state.last_result = None;
                Ok(FeedbackReply {
                    state: state.feedback.state(),
                    message: THANK_YOU_MESSAGE.to_string(),
                })
            }
            FeedbackEvent::SuggestionOpened => Ok(FeedbackReply {
                state: state.feedback.state(),
                message: SUGGESTION_PROMPT_MESSAGE.to_string(),
            }),
        }
    }

    pub async fn snapshot(&self, session: &Session) -> SessionSnapshot {
        let state = session.state().await;
        SessionSnapshot {
            session_id: session.id().to_string(),
            feedback_state: state.feedback.state(),
            feedback_choices: state.feedback.available_choices(),
            last_result: state.last_result.clone(),
            model_loaded: state.model.as_ref().is_some_and(|h| !h.is_released()),
            publisher_started: session.publisher_started(),
        }
    }

    /// Periodically expire idle sessions until shutdown
    pub fn spawn_session_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let app = Arc::clone(self);
        let period = app.sessions.session_timeout().min(SWEEP_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = app.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = app.sessions.evict_idle();
                        if evicted > 0 {
                            tracing::debug!("Expired {} idle session(s)", evicted);
                        }
                    }
                }
            }
        })
    }

    /// Stop the sweeper and all background publishers
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.sessions.cancel_all();
    }
}

/// Write to the interaction log; a failing disk is reported, not fatal
fn record(session: &Session, level: LogLevel, message: &str) {
    if let Err(e) = session.log().record(level, message) {
        tracing::error!(session = %session.id(), "Failed to write interaction log: {:#}", e);
    }
}
