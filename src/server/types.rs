// Request/response bodies for the chat HTTP surface

use serde::{Deserialize, Serialize};

use crate::app::FeedbackAction;
use crate::config::FeedbackOptions;
use crate::feedback::{FeedbackChoice, FeedbackState};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenSessionRequest {
    /// Existing token to resume, if any
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenSessionResponse {
    pub session_id: String,
    pub feedback_options: FeedbackOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub notices: Vec<String>,
}

/// Which feedback control was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackActionKind {
    Satisfied,
    Unsatisfied,
    Suggestion,
    SubmitSuggestion,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub action: FeedbackActionKind,
    #[serde(default)]
    pub text: Option<String>,
}

impl FeedbackRequest {
    pub fn into_action(self) -> FeedbackAction {
        match self.action {
            FeedbackActionKind::Satisfied => FeedbackAction::Choose(FeedbackChoice::Satisfied),
            FeedbackActionKind::Unsatisfied => FeedbackAction::Choose(FeedbackChoice::Unsatisfied),
            FeedbackActionKind::Suggestion => FeedbackAction::Choose(FeedbackChoice::Suggestion),
            FeedbackActionKind::SubmitSuggestion => {
                FeedbackAction::SubmitSuggestion(self.text.unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub state: FeedbackState,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}
