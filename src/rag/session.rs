//! Per-session conversation history.

use crate::llm::Role;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Default number of exchanges kept per session.
pub const DEFAULT_MAX_HISTORY: usize = 2;

/// Default number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone)]
struct SessionMessage {
    role: Role,
    content: String,
}

#[derive(Default)]
struct Sessions {
    counter: u64,
    messages: HashMap<String, Vec<SessionMessage>>,
    /// Session ids, oldest first.
    order: VecDeque<String>,
}

impl Sessions {
    fn insert(&mut self, id: &str, max_sessions: usize) -> &mut Vec<SessionMessage> {
        if !self.messages.contains_key(id) {
            while self.order.len() >= max_sessions.max(1) {
                match self.order.pop_front() {
                    Some(oldest) => {
                        debug!("Evicting session {}", oldest);
                        self.messages.remove(&oldest);
                    }
                    None => break,
                }
            }
            self.order.push_back(id.to_string());
        }
        self.messages.entry(id.to_string()).or_default()
    }

    fn remove(&mut self, id: &str) {
        if self.messages.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }
}

/// Bounded conversation logs keyed by session id.
pub struct SessionManager {
    max_history: usize,
    max_sessions: usize,
    inner: Mutex<Sessions>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl SessionManager {
    /// Keep the last `max_history` exchanges of each session.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            max_sessions: DEFAULT_MAX_SESSIONS,
            inner: Mutex::new(Sessions::default()),
        }
    }

    /// Keep at most `max_sessions` sessions, evicting the oldest first.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a new, empty session and return its id.
    pub fn create_session(&self) -> String {
        let mut inner = self.lock();
        inner.counter += 1;
        let id = format!("session_{}", inner.counter);
        inner.insert(&id, self.max_sessions);
        id
    }

    /// Append a message, creating the session if it does not exist.
    pub fn add_message(&self, session_id: &str, role: Role, content: &str) {
        let limit = self.max_history * 2;
        let mut inner = self.lock();
        let messages = inner.insert(session_id, self.max_sessions);
        messages.push(SessionMessage {
            role,
            content: content.to_string(),
        });
        if messages.len() > limit {
            let excess = messages.len() - limit;
            messages.drain(..excess);
        }
    }

    /// Record a question and its answer.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        self.add_message(session_id, Role::User, user);
        self.add_message(session_id, Role::Assistant, assistant);
    }

    /// Transcript of the session, or `None` for unknown and empty sessions.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let inner = self.lock();
        let messages = inner.messages.get(session_id)?;
        if messages.is_empty() {
            return None;
        }
        Some(
            messages
                .iter()
                .map(|m| {
                    let speaker = match m.role {
                        Role::User => "User",
                        Role::Assistant => "Assistant",
                    };
                    format!("{}: {}", speaker, m.content)
                })
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session. Adding a message under the same id starts it afresh.
    pub fn clear_session(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    pub fn session_count(&self) -> usize {
        self.lock().messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_ids_are_sequential() {
        let sessions = SessionManager::default();
        assert_eq!(sessions.create_session(), "session_1");
        assert_eq!(sessions.create_session(), "session_2");
        assert_eq!(sessions.session_count(), 2);
    }

    #[test]
    fn test_history_formatting() {
        let sessions = SessionManager::default();
        let id = sessions.create_session();
        sessions.add_exchange(&id, "What is MCP?", "A protocol.");

        assert_eq!(
            sessions.history(&id).as_deref(),
            Some("User: What is MCP?\nAssistant: A protocol.")
        );
    }

    #[test]
    fn test_unknown_and_empty_sessions_have_no_history() {
        let sessions = SessionManager::default();
        assert_eq!(sessions.history("missing"), None);

        let id = sessions.create_session();
        assert_eq!(sessions.history(&id), None);
    }

    #[test]
    fn test_history_is_bounded() {
        let sessions = SessionManager::new(2);
        let id = sessions.create_session();
        for i in 1..=3 {
            sessions.add_exchange(&id, &format!("q{}", i), &format!("a{}", i));
        }

        let history = sessions.history(&id).unwrap();
        assert_eq!(history, "User: q2\nAssistant: a2\nUser: q3\nAssistant: a3");
    }

    #[test]
    fn test_add_message_creates_unknown_session() {
        let sessions = SessionManager::default();
        sessions.add_message("external", Role::User, "hello");
        assert_eq!(sessions.history("external").as_deref(), Some("User: hello"));
    }

    #[test]
    fn test_clear_session() {
        let sessions = SessionManager::default();
        let id = sessions.create_session();
        sessions.add_exchange(&id, "q", "a");
        sessions.clear_session(&id);
        assert_eq!(sessions.history(&id), None);

        sessions.add_exchange(&id, "q2", "a2");
        assert!(sessions.history(&id).is_some());
    }

    #[test]
    fn test_clear_session_releases_entry() {
        let sessions = SessionManager::default();
        for _ in 0..100 {
            let id = sessions.create_session();
            sessions.add_exchange(&id, "q", "a");
            sessions.clear_session(&id);
        }
        assert_eq!(sessions.session_count(), 0);
    }

    #[test]
    fn test_oldest_session_is_evicted_at_cap() {
        let sessions = SessionManager::default().with_max_sessions(3);
        let ids: Vec<_> = (0..5).map(|_| sessions.create_session()).collect();
        sessions.add_message("external", Role::User, "hello");

        assert_eq!(sessions.session_count(), 3);
        assert_eq!(ids[4], "session_5");
        sessions.add_exchange(&ids[0], "q", "a");
        assert_eq!(sessions.session_count(), 3);
        assert!(sessions.history(&ids[3]).is_none());
        assert!(sessions.history("external").is_some());
        assert!(sessions.history(&ids[0]).is_some());
    }

    #[test]
    fn test_existing_session_is_not_reinserted() {
        let sessions = SessionManager::default().with_max_sessions(2);
        let first = sessions.create_session();
        let second = sessions.create_session();
        sessions.add_exchange(&first, "q1", "a1");
        sessions.add_exchange(&first, "q2", "a2");

        assert_eq!(sessions.session_count(), 2);
        assert!(sessions.history(&first).is_some());
        sessions.add_exchange(&second, "q", "a");
        assert!(sessions.history(&second).is_some());
    }
}
