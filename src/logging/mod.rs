// Interaction logging
//
// Every session writes queries, responses (optionally), errors and feedback
// to its own append-only file. That file is what the publisher ships.

pub mod interaction_logger;

pub use interaction_logger::{read_records, session_log_file_name, InteractionLogger, LogLevel};
