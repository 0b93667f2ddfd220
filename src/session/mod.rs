// Session store
//
// Explicit per-session context in place of an ambient key/value dictionary.

pub mod context;
pub mod manager;

pub use context::{Session, SessionState};
pub use manager::SessionManager;
