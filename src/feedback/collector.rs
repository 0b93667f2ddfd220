// Feedback collector - the reaction state machine for the latest result
//
//   NoResult -> ResultPending -> Rated
//                             -> SuggestionEntry -> Rated
//
// A new result restarts the cycle at ResultPending from any state.

use serde::{Deserialize, Serialize};

use crate::config::FeedbackOptions;
use crate::errors::FeedbackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackState {
    NoResult,
    ResultPending,
    SuggestionEntry,
    Rated,
}

/// A button on the feedback surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackChoice {
    Satisfied,
    Unsatisfied,
    Suggestion,
}

/// A completed rating, ready to be logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Satisfied,
    Unsatisfied,
    Suggestion(String),
}

impl Feedback {
    /// Interaction-log line for this rating
    pub fn log_message(&self, user_id: &str) -> String {
        match self {
            Feedback::Satisfied => {
                format!("User satisfaction (满意/Satisfied) for user ({})", user_id)
            }
            Feedback::Unsatisfied => {
                format!("User satisfaction (不满意/Unsatisfied) for user ({})", user_id)
            }
            Feedback::Suggestion(text) => {
                format!("User suggestion (建议/Suggestion) for user ({}): {}", user_id, text)
            }
        }
    }
}

/// Outcome of a feedback action that was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackEvent {
    /// Terminal rating; log it
    Rated(Feedback),
    /// Suggestion box opened; nothing to log yet
    SuggestionOpened,
}

#[derive(Debug, Clone)]
pub struct FeedbackCollector {
    options: FeedbackOptions,
    state: FeedbackState,
}

impl FeedbackCollector {
    pub fn new(options: FeedbackOptions) -> Self {
        Self {
            options,
            state: FeedbackState::NoResult,
        }
    }

    pub fn state(&self) -> FeedbackState {
        self.state
    }

    pub fn options(&self) -> FeedbackOptions {
        self.options
    }

    /// Buttons currently offered to the user
    pub fn available_choices(&self) -> Vec<FeedbackChoice> {
        if self.state != FeedbackState::ResultPending {
            return Vec::new();
        }
        let mut choices = vec![FeedbackChoice::Satisfied, FeedbackChoice::Unsatisfied];
        if self.options.allows_suggestion() {
            choices.push(FeedbackChoice::Suggestion);
        }
        choices
    }

    /// A new result supersedes whatever feedback came before
    pub fn on_new_result(&mut self) {
        self.state = FeedbackState::ResultPending;
    }

    pub fn choose(&mut self, choice: FeedbackChoice) -> Result<FeedbackEvent, FeedbackError> {
        match self.state {
            FeedbackState::ResultPending => {}
            FeedbackState::NoResult => return Err(FeedbackError::NoResult),
            FeedbackState::Rated => return Err(FeedbackError::AlreadyRated),
            // Only submit_suggestion leaves SuggestionEntry
            FeedbackState::SuggestionEntry => return Err(FeedbackError::AwaitingSuggestion),
        }

        match choice {
            FeedbackChoice::Satisfied => {
                self.state = FeedbackState::Rated;
                Ok(FeedbackEvent::Rated(Feedback::Satisfied))
            }
            FeedbackChoice::Unsatisfied => {
                self.state = FeedbackState::Rated;
                Ok(FeedbackEvent::Rated(Feedback::Unsatisfied))
            }
            FeedbackChoice::Suggestion => {
                if !self.options.allows_suggestion() {
                    return Err(FeedbackError::SuggestionDisabled);
                }
                self.state = FeedbackState::SuggestionEntry;
                Ok(FeedbackEvent::SuggestionOpened)
            }
        }
    }

    pub fn submit_suggestion(&mut self, text: &str) -> Result<FeedbackEvent, FeedbackError> {
        if self.state != FeedbackState::SuggestionEntry {
            return Err(FeedbackError::NotInSuggestionEntry);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(FeedbackError::EmptySuggestion);
        }

        self.state = FeedbackState::Rated;
        Ok(FeedbackEvent::Rated(Feedback::Suggestion(text.to_string())))
    }
}
