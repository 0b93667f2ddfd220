// Chatdesk - chat front-end over a locally hosted model
// Library exports

pub mod app;
pub mod chat;
pub mod config;
pub mod errors;
pub mod feedback;
pub mod git;
pub mod logging;
pub mod models;
pub mod publish;
pub mod server;
pub mod session;

pub use app::{AppError, ChatApp, FeedbackAction, FeedbackReply, SessionSnapshot, SubmitReply};
