//! Top-level question answering over course materials.

use super::session::SessionManager;
use crate::agent::{Agent, Outcome, Source};
use crate::error::Result;
use crate::search::PassageStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// RAG engine: wraps questions, threads session history through the agent,
/// and records each exchange.
pub struct RagEngine {
    agent: Agent,
    store: Arc<PassageStore>,
    sessions: Arc<SessionManager>,
}

impl RagEngine {
    pub fn new(agent: Agent, store: Arc<PassageStore>, sessions: Arc<SessionManager>) -> Self {
        Self {
            agent,
            store,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn store(&self) -> &Arc<PassageStore> {
        &self.store
    }

    /// Answer a question, in the context of `session_id` if given.
    ///
    /// The exchange is recorded under the session, which is created if unknown.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> Result<RagResponse> {
        let prompt = self.agent.prompts().render_query(question);
        let history = session_id.and_then(|id| self.sessions.history(id));

        let response = self.agent.run(&prompt, history.as_deref()).await?;

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, question, &response.answer);
        }

        info!(
            "Answered with {} source(s) after {} LLM call(s)",
            response.sources.len(),
            response.llm_calls
        );

        Ok(RagResponse {
            answer: response.answer,
            sources: response.sources,
            outcome: response.outcome,
        })
    }

    /// Course statistics for the catalog view.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles = self.store.course_titles().await?;
        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }
}

/// Answer plus the citations that back it.
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub outcome: Outcome,
}

impl RagResponse {
    /// Format the response for terminal display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!("\n{}", source.text));
                if let Some(link) = &source.link {
                    output.push_str(&format!("\n  {}", link));
                }
            }
        }

        output
    }
}

/// Indexed course overview.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CourseSearchTool, ToolRegistry, COURSE_SEARCH_TOOL};
    use crate::testing::{sample_store, text_response, tool_response, ScriptedModel, SAMPLE_COURSE};
    use serde_json::json;

    async fn engine(model: Arc<ScriptedModel>) -> RagEngine {
        let store = Arc::new(sample_store().await);
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(CourseSearchTool::new(store.clone())))
            .unwrap();
        let agent = Agent::new(model, Arc::new(registry));
        RagEngine::new(agent, store, Arc::new(SessionManager::default()))
    }

    #[tokio::test]
    async fn test_query_wraps_question_and_returns_sources() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_response("call_1", COURSE_SEARCH_TOOL, json!({"query": "neural networks"})),
            text_response("Neural networks are inspired by the brain."),
        ]));
        let engine = engine(model.clone()).await;

        let response = engine.query("What are neural networks?", None).await.unwrap();

        assert_eq!(response.answer, "Neural networks are inspired by the brain.");
        assert_eq!(response.outcome, Outcome::Answered);
        assert!(!response.sources.is_empty());
        assert!(response.sources[0].text.starts_with(SAMPLE_COURSE));

        let first = &model.requests()[0];
        match &first.messages[0].content[0] {
            crate::llm::ContentBlock::Text { text } => assert_eq!(
                text,
                "Answer this question about course materials: What are neural networks?"
            ),
            other => panic!("Expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_history_threads_into_next_query() {
        let model = Arc::new(ScriptedModel::new(vec![
            text_response("Lesson 1 covers agents."),
            text_response("Lesson 2 covers deep networks."),
        ]));
        let engine = engine(model.clone()).await;
        let session = engine.sessions().create_session();

        engine.query("What is lesson 1 about?", Some(&session)).await.unwrap();
        engine.query("And lesson 2?", Some(&session)).await.unwrap();

        let requests = model.requests();
        assert!(!requests[0].system.contains("Previous conversation:"));
        assert!(requests[1]
            .system
            .contains("User: What is lesson 1 about?\nAssistant: Lesson 1 covers agents."));
        assert_eq!(
            engine.sessions().history(&session).unwrap().lines().count(),
            4
        );
    }

    #[tokio::test]
    async fn test_query_without_session_records_nothing() {
        let model = Arc::new(ScriptedModel::new(vec![text_response("hi")]));
        let engine = engine(model).await;
        engine.query("hello", None).await.unwrap();
        assert_eq!(engine.sessions().session_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_query_is_not_recorded() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = engine(model).await;
        let session = engine.sessions().create_session();

        assert!(engine.query("hello", Some(&session)).await.is_err());
        assert_eq!(engine.sessions().history(&session), None);
    }

    #[tokio::test]
    async fn test_course_analytics() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let engine = engine(model).await;

        let analytics = engine.course_analytics().await.unwrap();
        assert_eq!(analytics.total_courses, 1);
        assert_eq!(analytics.course_titles, vec![SAMPLE_COURSE.to_string()]);
    }

    #[test]
    fn test_format_for_display() {
        let response = RagResponse {
            answer: "Answer".to_string(),
            sources: vec![Source {
                text: "Intro to AI - Lesson 1".to_string(),
                link: Some("https://example.com/lesson1".to_string()),
            }],
            outcome: Outcome::Answered,
        };
        let display = response.format_for_display();
        assert!(display.starts_with("Answer\n\n--- Sources ---"));
        assert!(display.contains("Intro to AI - Lesson 1\n  https://example.com/lesson1"));
    }
}
