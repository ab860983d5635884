//! Tool abstraction for the agent system.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema of a tool as offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object.
    pub parameters: Value,
}

/// A citation for one retrieved passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// `"<course> - Lesson <n>"`, or the course title.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Result of one tool execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    /// Citations backing `content`, in rank order.
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output with no citations.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema.
    fn schema(&self) -> ToolSchema;

    /// Execute with the model-supplied argument object.
    ///
    /// Errors are execution faults. Outcomes the model should read, such as
    /// "nothing found", belong in `Ok` content.
    async fn execute(&self, input: &Value) -> Result<ToolOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_omits_missing_link() {
        let source = Source {
            text: "Intro to AI".to_string(),
            link: None,
        };
        assert_eq!(
            serde_json::to_string(&source).unwrap(),
            r#"{"text":"Intro to AI"}"#
        );
    }
}
