// Shared fakes for integration tests
//
// FakeModel streams scripted partials, FakeFactory scripts load failures,
// FakePublisher counts publishes. None of them touch the network or git.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use chatdesk::config::{Config, FeedbackOptions, PublishMode};
use chatdesk::errors::LoadError;
use chatdesk::models::{
    ArtifactFetcher, InferenceModel, ModelFactory, PartialSender, ResourceLoader, Turn,
};
use chatdesk::publish::LogPublisher;
use chatdesk::ChatApp;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// One scripted generation
#[derive(Clone)]
pub enum Reply {
    Partials(Vec<String>),
    Fail(String),
}

pub fn partials(items: &[&str]) -> Reply {
    Reply::Partials(items.iter().map(|s| s.to_string()).collect())
}

/// Streams scripted replies in order, then repeats the fallback
pub struct FakeModel {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    pub queries: Mutex<Vec<(String, Vec<Turn>)>>,
    pub releases: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeModel {
    pub fn new(replies: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            queries: Mutex::new(Vec::new()),
            releases: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    /// Make the next generation wait until the returned gate is notified
    pub fn hold_next(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl InferenceModel for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn stream_chat(&self, query: &str, history: &[Turn], tx: &PartialSender) -> Result<()> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), history.to_vec()));
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Partials(items) => {
                for item in items {
                    if tx.send(Ok(item)).await.is_err() {
                        break;
                    }
                }
                Ok(())
            }
            Reply::Fail(message) => anyhow::bail!(message),
        }
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out one shared FakeModel after popping scripted load failures
pub struct FakeFactory {
    pub model: Arc<FakeModel>,
    failures: Mutex<VecDeque<LoadError>>,
    pub loads: AtomicUsize,
    pub reclaims: AtomicUsize,
}

impl FakeFactory {
    pub fn new(model: FakeModel, failures: Vec<LoadError>) -> Arc<Self> {
        Arc::new(Self {
            model: Arc::new(model),
            failures: Mutex::new(failures.into()),
            loads: AtomicUsize::new(0),
            reclaims: AtomicUsize::new(0),
        })
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelFactory for FakeFactory {
    async fn load(&self, _model_dir: &Path) -> Result<Arc<dyn InferenceModel>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(err) => Err(err),
            None => Ok(self.model.clone()),
        }
    }

    async fn reclaim(&self) {
        self.reclaims.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct NoopFetcher;

#[async_trait]
impl ArtifactFetcher for NoopFetcher {
    async fn ensure(&self) -> Result<(), LoadError> {
        Ok(())
    }
}

pub struct FailingFetcher;

#[async_trait]
impl ArtifactFetcher for FailingFetcher {
    async fn ensure(&self) -> Result<(), LoadError> {
        Err(LoadError::Provisioning("repository not found".into()))
    }
}

/// Counts publishes; fails every call when `fail` is set
pub struct FakePublisher {
    pub calls: AtomicUsize,
    pub published: Mutex<Vec<PathBuf>>,
    fail: Option<String>,
}

impl FakePublisher {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            fail: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            published: Mutex::new(Vec::new()),
            fail: Some(message.to_string()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogPublisher for FakePublisher {
    async fn publish(&self, log_file: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail {
            anyhow::bail!("{}", message);
        }
        self.published.lock().unwrap().push(log_file.to_path_buf());
        Ok(())
    }
}

/// Config rooted in a temp dir with the publisher switched off
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.logging.dir = dir.join("log");
    config.model.base_path = dir.join("RAG_models");
    config.publish.enabled = false;
    config.publish.interval_secs = Some(60);
    config
}

pub struct Harness {
    pub dir: TempDir,
    pub app: Arc<ChatApp>,
    pub factory: Arc<FakeFactory>,
    pub loader: Arc<ResourceLoader>,
}

pub struct HarnessBuilder {
    replies: Vec<Reply>,
    fallback: Reply,
    failures: Vec<LoadError>,
    publisher: Option<Arc<dyn LogPublisher>>,
    publish_mode: Option<PublishMode>,
    feedback: FeedbackOptions,
    log_responses: bool,
    max_sessions: Option<usize>,
    session_timeout_minutes: Option<u64>,
    publish_interval_secs: Option<u64>,
    fetcher: Option<Arc<dyn ArtifactFetcher>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            replies: Vec::new(),
            fallback: partials(&["Hello", "Hello there"]),
            failures: Vec::new(),
            publisher: None,
            publish_mode: None,
            feedback: FeedbackOptions::TwoButton,
            log_responses: false,
            max_sessions: None,
            session_timeout_minutes: None,
            publish_interval_secs: None,
            fetcher: None,
        }
    }

    pub fn replies(mut self, replies: Vec<Reply>) -> Self {
        self.replies = replies;
        self
    }

    pub fn load_failures(mut self, failures: Vec<LoadError>) -> Self {
        self.failures = failures;
        self
    }

    /// Enables the background publisher in `mode`
    pub fn publisher(mut self, publisher: Arc<dyn LogPublisher>, mode: PublishMode) -> Self {
        self.publisher = Some(publisher);
        self.publish_mode = Some(mode);
        self
    }

    pub fn feedback(mut self, options: FeedbackOptions) -> Self {
        self.feedback = options;
        self
    }

    pub fn log_responses(mut self, on: bool) -> Self {
        self.log_responses = on;
        self
    }

    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    pub fn session_timeout_minutes(mut self, minutes: u64) -> Self {
        self.session_timeout_minutes = Some(minutes);
        self
    }

    pub fn publish_interval_secs(mut self, secs: u64) -> Self {
        self.publish_interval_secs = Some(secs);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.feedback.options = self.feedback;
        config.logging.log_responses = self.log_responses;
        if let Some(max) = self.max_sessions {
            config.server.max_sessions = max;
        }
        if let Some(minutes) = self.session_timeout_minutes {
            config.server.session_timeout_minutes = minutes;
        }
        if let Some(secs) = self.publish_interval_secs {
            config.publish.interval_secs = Some(secs);
        }
        if let Some(mode) = self.publish_mode {
            config.publish.enabled = true;
            config.publish.mode = mode;
        }

        let factory = FakeFactory::new(FakeModel::new(self.replies, self.fallback), self.failures);
        let loader = Arc::new(ResourceLoader::new(
            config.model.model_dir(),
            self.fetcher.unwrap_or_else(|| Arc::new(NoopFetcher)),
            factory.clone(),
            Duration::from_secs(30),
        ));
        let app = Arc::new(ChatApp::new(config, Arc::clone(&loader), self.publisher));

        Harness {
            dir,
            app,
            factory,
            loader,
        }
    }
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// In-memory writer for capturing diagnostics
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route diagnostics on this thread into a buffer until the guard drops
pub fn capture_diagnostics() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
