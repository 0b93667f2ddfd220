// Feedback on the most recent result

pub mod collector;

pub use collector::{Feedback, FeedbackChoice, FeedbackCollector, FeedbackEvent, FeedbackState};
