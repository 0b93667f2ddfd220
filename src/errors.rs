// Typed errors for the places where callers must branch on the failure kind.
// Everything else propagates as anyhow::Error with context.

use thiserror::Error;

/// Failure while materialising an inference handle
#[derive(Debug, Error)]
pub enum LoadError {
    /// Device memory (or equivalent) exhausted; eligible for one busy retry
    #[error("resource exhausted while loading model: {0}")]
    ResourceExhausted(String),

    /// Artifact bundle missing and could not be fetched
    #[error("model provisioning failed: {0}")]
    Provisioning(String),

    /// Any other construction failure
    #[error("model backend error: {0}")]
    Backend(String),
}

impl LoadError {
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, LoadError::ResourceExhausted(_))
    }
}

/// Rejected feedback action. None of these append a log record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackError {
    #[error("there is no result to give feedback on")]
    NoResult,

    #[error("feedback was already given for this result")]
    AlreadyRated,

    #[error("suggestions are not enabled")]
    SuggestionDisabled,

    #[error("not currently entering a suggestion")]
    NotInSuggestionEntry,

    #[error("a suggestion is being entered; submit it first")]
    AwaitingSuggestion,

    #[error("{}", crate::config::constants::EMPTY_SUGGESTION_MESSAGE)]
    EmptySuggestion,
}
