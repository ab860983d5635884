//! The `search_course_content` tool.

use super::tools::{Source, Tool, ToolOutput, ToolSchema};
use crate::error::{CoursemateError, Result};
use crate::search::{PassageStore, SearchResults};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Name the model uses to call [`CourseSearchTool`].
pub const COURSE_SEARCH_TOOL: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct CourseSearchArgs {
    query: String,
    #[serde(default, alias = "courseName")]
    course_name: Option<String>,
    #[serde(default, alias = "lessonNumber")]
    lesson_number: Option<u32>,
}

/// Semantic search over course passages with optional course and lesson filters.
pub struct CourseSearchTool {
    store: Arc<PassageStore>,
}

impl CourseSearchTool {
    pub fn new(store: Arc<PassageStore>) -> Self {
        Self { store }
    }

    /// Citation for each passage, with lesson links where recorded.
    async fn sources(&self, results: &SearchResults) -> Vec<Source> {
        let mut sources = Vec::with_capacity(results.len());
        for (_, meta, _) in results.iter() {
            let link = match meta.lesson_number {
                Some(n) => self.store.lesson_link(&meta.course_title, n).await,
                None => None,
            };
            sources.push(Source {
                text: meta.label(),
                link,
            });
        }
        sources
    }
}

/// Text for a search that ran but matched nothing.
fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(n) = lesson_number {
        message.push_str(&format!(" in lesson {}", n));
    }
    message.push('.');
    message
}

/// One `[label]` header plus content block per passage, blank-line separated.
fn format_results(results: &SearchResults) -> String {
    results
        .iter()
        .map(|(content, meta, _)| format!("[{}]\n{}", meta.label(), content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: COURSE_SEARCH_TOOL.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: &Value) -> Result<ToolOutput> {
        let args: CourseSearchArgs = serde_json::from_value(input.clone()).map_err(|e| {
            CoursemateError::InvalidInput(format!("Invalid search arguments: {}", e))
        })?;

        info!(
            "Searching course content: {:?} (course: {:?}, lesson: {:?})",
            args.query, args.course_name, args.lesson_number
        );

        let results = self
            .store
            .search(&args.query, args.course_name.as_deref(), args.lesson_number)
            .await;

        if let Some(error) = results.error() {
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            return Ok(ToolOutput::text(no_results_message(
                args.course_name.as_deref(),
                args.lesson_number,
            )));
        }

        Ok(ToolOutput {
            content: format_results(&results),
            sources: self.sources(&results).await,
        })
    }
}
