//! RAG (Retrieval-Augmented Generation) question answering with sources.
//!
//! [`RagEngine`] is the entry point used by the CLI and the HTTP server.
//! Conversation context comes from the [`SessionManager`].

mod engine;
mod session;

pub use engine::{CourseAnalytics, RagEngine, RagResponse};
pub use session::{SessionManager, DEFAULT_MAX_HISTORY, DEFAULT_MAX_SESSIONS};
